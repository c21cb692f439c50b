//! Binds the peer discovery role to the broker service account

use super::{RabbitmqResourceBuilder, ResourceBuilder, ROLE_SUFFIX, SERVER_SUFFIX};
use crate::error::Result;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};

#[derive(Debug)]
pub struct RoleBindingBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> RoleBindingBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for RoleBindingBuilder<'_> {
    type Object = RoleBinding;

    fn build(&self) -> Result<RoleBinding> {
        Ok(RoleBinding {
            metadata: self.base.object_meta(SERVER_SUFFIX),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: self.base.name(ROLE_SUFFIX),
            },
            subjects: None,
        })
    }

    fn update(&mut self, binding: &mut RoleBinding) -> Result<()> {
        self.base.update_metadata(&mut binding.metadata)?;
        // roleRef is immutable; only subjects are reconciled
        binding.subjects = Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: self.base.name(SERVER_SUFFIX),
            namespace: Some(self.base.namespace()),
            ..Default::default()
        }]);
        Ok(())
    }
}
