//! Erlang distribution cookie (`<name>-erlang-cookie`)
//!
//! All nodes of a cluster must share the cookie; rotating it would split the
//! cluster, so it is generated once and never touched again.

use super::admin_secret::{ensure_generated, generate_token};
use super::{RabbitmqResourceBuilder, ResourceBuilder, ERLANG_COOKIE_SUFFIX};
use crate::error::Result;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

pub const COOKIE_KEY: &str = ".erlang.cookie";

#[derive(Debug)]
pub struct ErlangCookieBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> ErlangCookieBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for ErlangCookieBuilder<'_> {
    type Object = Secret;

    fn build(&self) -> Result<Secret> {
        Ok(Secret {
            metadata: self.base.object_meta(ERLANG_COOKIE_SUFFIX),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        })
    }

    fn update(&mut self, secret: &mut Secret) -> Result<()> {
        self.base.update_metadata(&mut secret.metadata)?;
        ensure_generated(
            secret.data.get_or_insert_with(BTreeMap::new),
            COOKIE_KEY,
            || generate_token(24),
        );
        Ok(())
    }
}
