// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Key-value backend trait and the in-memory backend.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::error::StorageError;

/// Maximum encoded key size in bytes.
pub const MAX_KEY_SIZE: usize = 8 * 1024;

/// A single change applied as part of an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Mutation {
    /// Returns the key this mutation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// Ordered key-value storage underneath the relation tables.
///
/// Implementations must apply a batch all-or-nothing and must return
/// prefix scans in ascending byte order.
pub trait KvBackend: Send + Sync {
    /// Reads a single key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns every entry whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Atomically applies a batch of mutations.
    fn apply(&self, batch: Vec<Mutation>) -> Result<(), StorageError>;
}

pub(crate) fn validate_key(key: &[u8]) -> Result<(), StorageError> {
    if key.len() > MAX_KEY_SIZE {
        return Err(StorageError::InvalidKeyEncoding(format!(
            "key of {} bytes exceeds {}",
            key.len(),
            MAX_KEY_SIZE
        )));
    }
    Ok(())
}

/// Volatile backend over an ordered map.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, batch: Vec<Mutation>) -> Result<(), StorageError> {
        for mutation in &batch {
            validate_key(mutation.key())?;
        }

        let mut entries = self.entries.write();
        for mutation in batch {
            match mutation {
                Mutation::Put { key, value } => {
                    entries.insert(key, value);
                }
                Mutation::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}
