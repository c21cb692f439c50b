//! Registry pull secret (`<name>-registry-access`)
//!
//! A copy of the operator's default pull secret placed in the cluster
//! namespace, since pods can only reference secrets in their own namespace.

use super::{RabbitmqResourceBuilder, ResourceBuilder, REGISTRY_SECRET_SUFFIX};
use crate::error::Result;
use k8s_openapi::api::core::v1::Secret;

pub const DOCKER_CONFIG_JSON_TYPE: &str = "kubernetes.io/dockerconfigjson";

#[derive(Debug)]
pub struct RegistrySecretBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
    source: Secret,
}

impl<'a> RegistrySecretBuilder<'a> {
    /// `source` is the default pull secret read from the operator namespace
    pub fn new(base: RabbitmqResourceBuilder<'a>, source: Secret) -> Self {
        Self { base, source }
    }
}

impl ResourceBuilder for RegistrySecretBuilder<'_> {
    type Object = Secret;

    fn build(&self) -> Result<Secret> {
        Ok(Secret {
            metadata: self.base.object_meta(REGISTRY_SECRET_SUFFIX),
            type_: Some(
                self.source
                    .type_
                    .clone()
                    .unwrap_or_else(|| DOCKER_CONFIG_JSON_TYPE.to_string()),
            ),
            ..Default::default()
        })
    }

    fn update(&mut self, secret: &mut Secret) -> Result<()> {
        self.base.update_metadata(&mut secret.metadata)?;
        // type is immutable once created
        if secret.type_.is_none() {
            secret.type_ = self.source.type_.clone();
        }
        secret.data = self.source.data.clone();
        Ok(())
    }
}
