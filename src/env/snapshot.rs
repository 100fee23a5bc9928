//! Parsed environment model
//!
//! An [`EnvSnapshot`] holds the result of one parse pass, partitioned into
//! plain values and secret references.

use serde::Serialize;
use std::collections::HashMap;

/// Plain values and secret references parsed from a single source.
///
/// A key lives in exactly one partition: assigning it to one side removes
/// any earlier entry for it on the other side. The last assignment wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvSnapshot {
    plain: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a literal value under `key`.
    pub fn set_plain<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        self.secrets.remove(&key);
        self.plain.insert(key, value.into());
    }

    /// Store a secret reference under `key`.
    pub fn set_secret<K: Into<String>, R: Into<String>>(&mut self, key: K, reference: R) {
        let key = key.into();
        self.plain.remove(&key);
        self.secrets.insert(key, reference.into());
    }

    pub fn plain(&self) -> &HashMap<String, String> {
        &self.plain
    }

    pub fn secrets(&self) -> &HashMap<String, String> {
        &self.secrets
    }

    pub fn get_plain(&self, key: &str) -> Option<&str> {
        self.plain.get(key).map(String::as_str)
    }

    pub fn get_secret(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    pub fn has_secrets(&self) -> bool {
        !self.secrets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plain.len() + self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.secrets.is_empty()
    }

    /// All keys across both partitions, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .plain
            .keys()
            .chain(self.secrets.keys())
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }
}
