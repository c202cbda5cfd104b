// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Named relation tables over a key-value backend.
//!
//! Tables are registered in a catalog stored alongside the rows, so a
//! persistent store reopened later recognises the tables it already holds.
//! Each table maps to one of a fixed set of gate mutexes; a transaction
//! holds the gates of every table it declared until it commits or is
//! dropped, which serialises transactions touching the same tables while
//! letting unrelated tables proceed in parallel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::StoreConfig;

use super::backend::{KvBackend, MemoryBackend, Mutation};
use super::key::encode_table_key;
use super::rocks::RocksBackend;
use super::txn::{StoreTxn, TxnId};
use super::StorageError;

const NUM_GATES: usize = 64;

/// Table id reserved for the catalog.
const CATALOG_TABLE_ID: u16 = 0;

/// A relation table: a stable numeric id plus a name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Table {
    id: u16,
    name: &'static str,
}

impl Table {
    pub const fn new(id: u16, name: &'static str) -> Self {
        Self { id, name }
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn gate_index(&self) -> usize {
        self.id as usize % NUM_GATES
    }
}

/// Transactional store of relation tables.
pub struct RelationStore {
    backend: Box<dyn KvBackend>,
    gates: [Mutex<()>; NUM_GATES],
    tables: RwLock<BTreeMap<u16, &'static str>>,
    next_txn_id: AtomicU64,
}

impl RelationStore {
    /// Creates a store over an existing backend.
    pub fn new(backend: Box<dyn KvBackend>) -> Self {
        Self {
            backend,
            gates: std::array::from_fn(|_| Mutex::new(())),
            tables: RwLock::new(BTreeMap::new()),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Creates a volatile store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Opens the store described by `config`.
    ///
    /// Without a path the store is volatile; with one it is backed by
    /// RocksDB at that location.
    pub fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        match config.path.as_deref() {
            Some(path) => {
                info!(path = %path.display(), durability = ?config.durability, "opening persistent relation store");
                let backend = RocksBackend::open_with_durability(path, config.durability)?;
                Ok(Self::new(Box::new(backend)))
            }
            None => {
                info!("opening in-memory relation store");
                Ok(Self::in_memory())
            }
        }
    }

    pub(crate) fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    /// Registers a table, persisting it in the catalog.
    ///
    /// Returns `true` if the table was newly created and `false` if it was
    /// already present under the same name.
    pub fn create_table(&self, table: Table) -> Result<bool, StorageError> {
        if table.id == CATALOG_TABLE_ID {
            return Err(StorageError::ReservedTable(table.id));
        }

        let _gate = self.gates[table.gate_index()].lock();
        let catalog_key = encode_table_key(CATALOG_TABLE_ID, &table.id.to_be_bytes());

        let created = match self.backend.get(&catalog_key)? {
            Some(existing) => {
                if existing != table.name.as_bytes() {
                    return Err(StorageError::TableConflict {
                        id: table.id,
                        existing: String::from_utf8_lossy(&existing).into_owned(),
                    });
                }
                false
            }
            None => {
                self.backend.apply(vec![Mutation::Put {
                    key: catalog_key,
                    value: table.name.as_bytes().to_vec(),
                }])?;
                true
            }
        };

        self.tables.write().insert(table.id, table.name);
        debug!(table = table.name, id = table.id, created, "table registered");
        Ok(created)
    }

    /// Returns true if the table has been registered with this handle.
    pub fn has_table(&self, table: Table) -> bool {
        self.tables.read().get(&table.id) == Some(&table.name)
    }

    /// Begins a transaction over the given tables.
    ///
    /// Blocks until every gate covering those tables is free. Gates are
    /// taken in ascending index order so concurrent transactions cannot
    /// deadlock on each other.
    pub fn begin(&self, tables: &[Table]) -> Result<StoreTxn<'_>, StorageError> {
        if let Some(missing) = tables.iter().find(|t| !self.has_table(**t)) {
            return Err(StorageError::UnknownTable(missing.name));
        }

        let mut indices: Vec<usize> = tables.iter().map(Table::gate_index).collect();
        indices.sort_unstable();
        indices.dedup();

        let guards = indices.iter().map(|&i| self.gates[i].lock()).collect();
        let id = TxnId(self.next_txn_id.fetch_add(1, Ordering::Relaxed));

        Ok(StoreTxn::new(id, self, tables.to_vec(), guards))
    }
}
