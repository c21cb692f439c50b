//! Service account (`<name>-server`) the broker pods run as

use super::{RabbitmqResourceBuilder, ResourceBuilder, SERVER_SUFFIX};
use crate::error::Result;
use k8s_openapi::api::core::v1::ServiceAccount;

#[derive(Debug)]
pub struct ServiceAccountBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> ServiceAccountBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for ServiceAccountBuilder<'_> {
    type Object = ServiceAccount;

    fn build(&self) -> Result<ServiceAccount> {
        Ok(ServiceAccount {
            metadata: self.base.object_meta(SERVER_SUFFIX),
            ..Default::default()
        })
    }

    fn update(&mut self, service_account: &mut ServiceAccount) -> Result<()> {
        self.base.update_metadata(&mut service_account.metadata)
    }
}
