// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Store transactions.
//!
//! A transaction buffers its writes in a write set and applies them as one
//! atomic backend batch on commit. Reads see the transaction's own pending
//! writes. Dropping a transaction without committing discards the write set.

use std::collections::BTreeMap;

use parking_lot::MutexGuard;
use tracing::{debug, trace};

use super::backend::Mutation;
use super::key::{encode_table_key, table_prefix};
use super::relation::{RelationStore, Table};
use super::StorageError;

/// Unique transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnId(pub u64);

/// Transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Committed,
    RolledBack,
}

/// A row returned by a scan, with the table prefix stripped from its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A caller-defined membership test applied to stored rows.
///
/// Lets a query ask "which rows belong to this set" without first
/// materialising the set as rows of its own.
pub trait VirtualSet {
    fn is_in_set(&self, key: &[u8], value: &[u8]) -> Result<bool, StorageError>;
}

impl<F> VirtualSet for F
where
    F: Fn(&[u8], &[u8]) -> Result<bool, StorageError>,
{
    fn is_in_set(&self, key: &[u8], value: &[u8]) -> Result<bool, StorageError> {
        self(key, value)
    }
}

/// A transaction over a fixed set of tables.
pub struct StoreTxn<'a> {
    id: TxnId,
    store: &'a RelationStore,
    tables: Vec<Table>,
    _gates: Vec<MutexGuard<'a, ()>>,
    /// Pending writes keyed by full stored key; `None` marks a delete.
    write_set: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    state: TxnState,
}

impl<'a> StoreTxn<'a> {
    pub(crate) fn new(
        id: TxnId,
        store: &'a RelationStore,
        tables: Vec<Table>,
        gates: Vec<MutexGuard<'a, ()>>,
    ) -> Self {
        trace!(txn_id = id.0, tables = tables.len(), "transaction started");
        Self {
            id,
            store,
            tables,
            _gates: gates,
            write_set: BTreeMap::new(),
            state: TxnState::Active,
        }
    }

    #[inline]
    pub fn id(&self) -> TxnId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> TxnState {
        self.state
    }

    /// Returns the number of buffered writes.
    #[inline]
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    fn check_table(&self, table: Table) -> Result<(), StorageError> {
        if self.tables.contains(&table) {
            Ok(())
        } else {
            Err(StorageError::TableNotInTransaction(table.name()))
        }
    }

    /// Reads one row by key.
    pub fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_table(table)?;
        let stored = encode_table_key(table.id(), key);
        if let Some(pending) = self.write_set.get(&stored) {
            return Ok(pending.clone());
        }
        self.store.backend().get(&stored)
    }

    /// Inserts or replaces a row.
    pub fn put(&mut self, table: Table, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.check_table(table)?;
        self.write_set
            .insert(encode_table_key(table.id(), &key), Some(value));
        Ok(())
    }

    /// Deletes a row. Deleting an absent row is not an error.
    pub fn delete(&mut self, table: Table, key: &[u8]) -> Result<(), StorageError> {
        self.check_table(table)?;
        self.write_set.insert(encode_table_key(table.id(), key), None);
        Ok(())
    }

    /// Returns every row whose key starts with `prefix`, in key order.
    pub fn scan(&self, table: Table, prefix: &[u8]) -> Result<Vec<Row>, StorageError> {
        self.check_table(table)?;
        let stored_prefix = encode_table_key(table.id(), prefix);

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .store
            .backend()
            .scan_prefix(&stored_prefix)?
            .into_iter()
            .collect();

        for (key, pending) in self
            .write_set
            .range(stored_prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&stored_prefix))
        {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        let strip = table_prefix(table.id()).len();
        Ok(merged
            .into_iter()
            .map(|(key, value)| Row {
                key: key[strip..].to_vec(),
                value,
            })
            .collect())
    }

    /// Returns every row of the table that belongs to `set`.
    pub fn scan_in_set(&self, table: Table, set: &dyn VirtualSet) -> Result<Vec<Row>, StorageError> {
        let mut rows = Vec::new();
        for row in self.scan(table, &[])? {
            if set.is_in_set(&row.key, &row.value)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Returns true if any row of the table belongs to `set`.
    pub fn any_in_set(&self, table: Table, set: &dyn VirtualSet) -> Result<bool, StorageError> {
        for row in self.scan(table, &[])? {
            if set.is_in_set(&row.key, &row.value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Applies the write set atomically and releases the table gates.
    pub fn commit(mut self) -> Result<(), StorageError> {
        let write_set = std::mem::take(&mut self.write_set);
        let count = write_set.len();

        if !write_set.is_empty() {
            let batch = write_set
                .into_iter()
                .map(|(key, pending)| match pending {
                    Some(value) => Mutation::Put { key, value },
                    None => Mutation::Delete { key },
                })
                .collect();
            if let Err(e) = self.store.backend().apply(batch) {
                self.state = TxnState::RolledBack;
                return Err(e);
            }
        }

        self.state = TxnState::Committed;
        trace!(txn_id = self.id.0, writes = count, "transaction committed");
        Ok(())
    }

    /// Discards the write set and releases the table gates.
    pub fn rollback(mut self) {
        self.write_set.clear();
        self.state = TxnState::RolledBack;
        trace!(txn_id = self.id.0, "transaction rolled back");
    }
}

impl Drop for StoreTxn<'_> {
    fn drop(&mut self) {
        if self.state == TxnState::Active {
            debug!(
                txn_id = self.id.0,
                discarded = self.write_set.len(),
                "transaction dropped without commit"
            );
            self.state = TxnState::RolledBack;
        }
    }
}
