// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! RocksDB-backed persistent backend.

use std::path::Path;

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch, WriteOptions};

use super::backend::{validate_key, KvBackend, Mutation};
use super::StorageError;

/// Durability mode for committed batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Batches are written to the WAL but not fsynced.
    /// Survives a process crash, not a power failure.
    #[default]
    WalOnly,
    /// Every batch is fsynced before commit returns.
    FsyncEveryWrite,
}

/// Relation rows stored in a RocksDB database.
pub struct RocksBackend {
    db: DBWithThreadMode<MultiThreaded>,
    write_opts: WriteOptions,
}

impl RocksBackend {
    /// Opens or creates a database using `DurabilityMode::WalOnly`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_durability(path, DurabilityMode::default())
    }

    /// Opens or creates a database with the given durability mode.
    pub fn open_with_durability(
        path: &Path,
        durability: DurabilityMode,
    ) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(16 * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_level_compaction_dynamic_level_bytes(true);

        // Point lookups dominate: one row per (resource, owner).
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        let db = DBWithThreadMode::open(&opts, path)?;

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(durability == DurabilityMode::FsyncEveryWrite);

        Ok(Self { db, write_opts })
    }

    /// Flushes memtables to disk.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvBackend for RocksBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        Ok(self.db.get(key)?)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut rows = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }

        Ok(rows)
    }

    fn apply(&self, batch: Vec<Mutation>) -> Result<(), StorageError> {
        let mut write_batch = WriteBatch::default();

        for mutation in &batch {
            validate_key(mutation.key())?;
            match mutation {
                Mutation::Put { key, value } => write_batch.put(key, value),
                Mutation::Delete { key } => write_batch.delete(key),
            }
        }

        self.db.write_opt(write_batch, &self.write_opts)?;
        Ok(())
    }
}
