// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Transactional relation storage.
//!
//! Rows live in named tables over an ordered key-value backend, either an
//! in-memory map or RocksDB. All reads and writes go through a [`StoreTxn`],
//! which buffers writes and applies them as a single atomic batch on commit.
//!
//! # Example
//!
//! ```no_run
//! use briefcase_arbiter::storage::{RelationStore, RowKeyReader, RowKeyWriter, Table};
//!
//! const NOTES: Table = Table::new(10, "notes");
//!
//! let store = RelationStore::in_memory();
//! store.create_table(NOTES).unwrap();
//!
//! let mut txn = store.begin(&[NOTES]).unwrap();
//! let key = RowKeyWriter::new().u64(1).finish();
//! txn.put(NOTES, key.clone(), RowKeyWriter::new().str("hello").finish()).unwrap();
//! txn.commit().unwrap();
//!
//! let txn = store.begin(&[NOTES]).unwrap();
//! let value = txn.get(NOTES, &key).unwrap().unwrap();
//! assert_eq!(RowKeyReader::new(&value).str().unwrap(), "hello");
//! ```

mod backend;
mod error;
mod key;
mod relation;
mod rocks;
mod txn;

pub use backend::{KvBackend, MemoryBackend, Mutation, MAX_KEY_SIZE};
pub use error::StorageError;
pub use key::{decode_table_key, encode_table_key, table_prefix, RowKeyReader, RowKeyWriter};
pub use relation::{RelationStore, Table};
pub use rocks::{DurabilityMode, RocksBackend};
pub use txn::{Row, StoreTxn, TxnId, TxnState, VirtualSet};
