//! Peer discovery role (`<name>-endpoint-discovery`)

use super::{RabbitmqResourceBuilder, ResourceBuilder, ROLE_SUFFIX};
use crate::error::Result;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role};

fn rule(resource: &str, verb: &str) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec![resource.to_string()]),
        verbs: vec![verb.to_string()],
        ..Default::default()
    }
}

#[derive(Debug)]
pub struct RoleBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> RoleBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for RoleBuilder<'_> {
    type Object = Role;

    fn build(&self) -> Result<Role> {
        Ok(Role {
            metadata: self.base.object_meta(ROLE_SUFFIX),
            ..Default::default()
        })
    }

    fn update(&mut self, role: &mut Role) -> Result<()> {
        self.base.update_metadata(&mut role.metadata)?;
        role.rules = Some(vec![rule("endpoints", "get"), rule("events", "create")]);
        Ok(())
    }
}
