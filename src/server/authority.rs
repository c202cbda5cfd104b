// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The repository authority: registries behind one [`RepositoryManager`].

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::StoreConfig;
use crate::repository::{
    HeldResources, RegistryError, RepositoryManager, RepositoryStatus, Request, Resources,
    ResourceStates, Response,
};
use crate::resource::{CodeSet, LockRequest, LockableIdSet, ReplicaId, RevisionId};
use crate::storage::{RelationStore, StorageError, StoreTxn};

use super::{CodeRegistry, LockRegistry, RevisionSynchronizer, CODES_TABLE, LOCKS_TABLE};

/// Owns the lock and code registries of one dataset.
///
/// Calls that touch both registries run in a single store transaction over
/// both tables, so a combined request is applied completely or not at all.
pub struct Authority {
    store: Arc<RelationStore>,
    locks: LockRegistry,
    codes: Arc<CodeRegistry>,
    revisions: RevisionSynchronizer,
}

impl Authority {
    /// Creates an authority over `store`, creating the registry tables if needed.
    pub fn new(store: Arc<RelationStore>) -> Result<Self, RegistryError> {
        let locks = LockRegistry::new(Arc::clone(&store))?;
        let codes = Arc::new(CodeRegistry::new(Arc::clone(&store))?);
        let revisions = RevisionSynchronizer::new(Arc::clone(&codes));
        Ok(Self {
            store,
            locks,
            codes,
            revisions,
        })
    }

    /// Opens the store described by `config` and creates an authority over it.
    pub fn open(config: &StoreConfig) -> Result<Self, RegistryError> {
        let store = RelationStore::open(config)?;
        info!(in_memory = config.is_in_memory(), "repository authority started");
        Self::new(Arc::new(store))
    }

    /// An authority over a fresh in-memory store.
    pub fn in_memory() -> Result<Self, RegistryError> {
        Self::new(Arc::new(RelationStore::in_memory()))
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn codes(&self) -> &CodeRegistry {
        &self.codes
    }

    pub fn revisions(&self) -> &RevisionSynchronizer {
        &self.revisions
    }

    fn begin_all(&self) -> Result<StoreTxn<'_>, StorageError> {
        self.store.begin(&[LOCKS_TABLE, CODES_TABLE])
    }
}

impl RepositoryManager for Authority {
    #[instrument(skip(self, request), fields(locks = request.locks.len(), codes = request.codes.len()))]
    fn process_request(
        &self,
        request: &Request,
        replica: ReplicaId,
        query_only: bool,
    ) -> Result<Response, RegistryError> {
        let mut txn = self.begin_all()?;

        let codes = self
            .codes
            .evaluate_reserve_in(&txn, &request.codes, replica, request.options)?;
        let locks = self
            .locks
            .evaluate_in(&txn, &request.locks, replica, request.options)?;

        // A lock denial outranks a code denial.
        let status = if locks.status.is_success() {
            codes.status
        } else {
            locks.status
        };
        let response = Response {
            status,
            lock_states: locks.denied,
            code_states: codes.denied,
        };

        if !status.is_success() || query_only {
            txn.rollback();
            return Ok(response);
        }

        self.codes
            .apply_reserve_in(&mut txn, &request.codes, replica, &codes.retained)?;
        self.locks.apply_in(&mut txn, &request.locks, replica)?;
        txn.commit()?;
        Ok(response)
    }

    #[instrument(skip(self, locks, codes), fields(locks = locks.len(), codes = codes.len()))]
    fn demote(
        &self,
        locks: &LockRequest,
        codes: &CodeSet,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin_all()?;

        let status = self.codes.release_in(&mut txn, codes, replica)?;
        if !status.is_success() {
            warn!(status = %status, "demote rejected");
            txn.rollback();
            return Ok(status);
        }

        self.locks.demote_in(&mut txn, locks, replica)?;
        txn.commit()?;
        Ok(RepositoryStatus::Success)
    }

    #[instrument(skip(self))]
    fn relinquish(
        &self,
        which: Resources,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin_all()?;

        if which.includes_codes() {
            let status = self.codes.relinquish_in(&mut txn, replica)?;
            if !status.is_success() {
                txn.rollback();
                return Ok(status);
            }
        }
        if which.includes_locks() {
            self.locks.relinquish_in(&mut txn, replica)?;
        }

        txn.commit()?;
        Ok(RepositoryStatus::Success)
    }

    fn query_held_resources(&self, replica: ReplicaId) -> Result<HeldResources, RegistryError> {
        let txn = self.begin_all()?;
        Ok(HeldResources {
            locks: self.locks.query_locks_in(&txn, replica)?,
            codes: self.codes.query_codes_in(&txn, replica)?,
        })
    }

    fn query_states(
        &self,
        locks: &LockableIdSet,
        codes: &CodeSet,
    ) -> Result<ResourceStates, RegistryError> {
        let txn = self.begin_all()?;
        Ok(ResourceStates {
            locks: self.locks.query_lock_states_in(&txn, locks)?,
            codes: self.codes.query_code_states_in(&txn, codes)?,
        })
    }

    fn on_revision_committed(
        &self,
        assigned: &CodeSet,
        discarded: &CodeSet,
        revision: &RevisionId,
    ) -> Result<(), RegistryError> {
        self.revisions
            .on_revision_committed(assigned, discarded, revision)
    }
}
