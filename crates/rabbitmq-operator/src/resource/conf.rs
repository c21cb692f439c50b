//! `rabbitmq.conf` documents
//!
//! RabbitMQ reads a flat, sysctl-like format: one `key = value` pair per
//! line in a single unnamed section. [`ConfDocument`] keeps keys in
//! insertion order and always renders through one canonical writer, so two
//! documents with the same entries serialize to the same bytes.

use crate::error::{OperatorError, Result};
use indexmap::IndexMap;
use std::fmt;

/// Ordered `key = value` document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfDocument {
    entries: IndexMap<String, String>,
}

impl ConfDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document. `source_name` only appears in error messages.
    pub fn parse(source_name: &str, text: &str) -> Result<Self> {
        let mut doc = Self::new();
        doc.append(source_name, text)?;
        Ok(doc)
    }

    /// Merge the entries of `text` into this document.
    ///
    /// Keys already present keep their position and take the new value;
    /// new keys are appended in the order they appear.
    pub fn append(&mut self, source_name: &str, text: &str) -> Result<()> {
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let parse_error = |message: &str| OperatorError::ConfigParse {
                source_name: source_name.to_string(),
                line: idx + 1,
                message: message.to_string(),
            };

            if line.starts_with('[') {
                return Err(parse_error("sections are not supported"));
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| parse_error("key-value delimiter not found"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(parse_error("empty key"));
            }
            self.set(key, value.trim());
        }
        Ok(())
    }

    /// Insert or overwrite a key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remove every key starting with `prefix`, preserving the order of the rest
    pub fn remove_prefixed(&mut self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    /// Keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical writer: `key = value` lines, no trailing newline.
impl fmt::Display for ConfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}
