//! Default administrator credentials (`<name>-admin`)

use super::{RabbitmqResourceBuilder, ResourceBuilder, ADMIN_SECRET_SUFFIX};
use crate::error::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use rand::RngCore;
use std::collections::BTreeMap;

pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";

/// Random URL-safe token built from `bytes` bytes of entropy
pub(crate) fn generate_token(bytes: usize) -> String {
    let mut raw = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Insert a freshly generated value under `key` unless one is present
pub(crate) fn ensure_generated(
    data: &mut BTreeMap<String, ByteString>,
    key: &str,
    generate: impl FnOnce() -> String,
) {
    data.entry(key.to_string())
        .or_insert_with(|| ByteString(generate().into_bytes()));
}

#[derive(Debug)]
pub struct AdminSecretBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> AdminSecretBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for AdminSecretBuilder<'_> {
    type Object = Secret;

    fn build(&self) -> Result<Secret> {
        Ok(Secret {
            metadata: self.base.object_meta(ADMIN_SECRET_SUFFIX),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        })
    }

    /// Credentials are generated on first update and never rotated
    fn update(&mut self, secret: &mut Secret) -> Result<()> {
        self.base.update_metadata(&mut secret.metadata)?;
        let data = secret.data.get_or_insert_with(BTreeMap::new);
        ensure_generated(data, USERNAME_KEY, || generate_token(18));
        ensure_generated(data, PASSWORD_KEY, || generate_token(24));
        Ok(())
    }
}
