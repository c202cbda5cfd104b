// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! A briefcase's local record of the locks and codes it holds.
//!
//! The cache answers "do I already hold this?" without a round trip to the
//! authority. It is filled from the authority on first use, grows as
//! requests are granted, and shrinks on demote and relinquish.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::repository::{RegistryError, RepositoryManager, RepositoryStatus, Resources};
use crate::resource::{Code, CodeSet, Lock, LockLevel, LockRequest, LockableId, LockableKind, ReplicaId};

use super::containment::{implied_locks, ContainmentLookup};

#[derive(Debug, Default)]
struct CacheState {
    initialized: bool,
    /// Locks granted to this replica by the authority.
    locks: BTreeMap<LockableId, LockLevel>,
    /// Exclusive locks covered by an exclusive container or store, keyed by
    /// the covered resource, valued by every lock covering it.
    implied: BTreeMap<LockableId, BTreeSet<LockableId>>,
    /// Resources created in this briefcase and not yet pushed. The
    /// authority has never heard of them.
    local: BTreeSet<LockableId>,
    codes: CodeSet,
}

impl CacheState {
    fn level(&self, id: &LockableId) -> LockLevel {
        if self.implied.contains_key(id) || self.local.contains(id) {
            return LockLevel::Exclusive;
        }
        self.locks.get(id).copied().unwrap_or_default()
    }

    fn record(&mut self, locks: &LockRequest, lookup: &dyn ContainmentLookup) {
        for lock in locks.iter() {
            if lock.level == LockLevel::None {
                continue;
            }
            let level = self.locks.entry(lock.id).or_default();
            if lock.level > *level {
                *level = lock.level;
            }
            self.cover(&lock, lookup);
        }
    }

    fn cover(&mut self, lock: &Lock, lookup: &dyn ContainmentLookup) {
        for covered in implied_locks(lock, lookup).ids() {
            self.implied.entry(*covered).or_default().insert(lock.id);
        }
    }

    fn drop_implied_by(&mut self, source: &LockableId) {
        self.implied.retain(|_, covering| {
            covering.remove(source);
            !covering.is_empty()
        });
    }
}

/// Per-replica cache of held locks and reserved codes.
pub struct ReplicaCache {
    replica: ReplicaId,
    containment: Arc<dyn ContainmentLookup>,
    state: RwLock<CacheState>,
}

impl ReplicaCache {
    pub fn new(replica: ReplicaId, containment: Arc<dyn ContainmentLookup>) -> Self {
        Self {
            replica,
            containment,
            state: RwLock::new(CacheState::default()),
        }
    }

    #[inline]
    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    fn load(&self, state: &mut CacheState, authority: &dyn RepositoryManager) -> Result<(), RegistryError> {
        let held = authority.query_held_resources(self.replica)?;
        state.record(&held.locks, self.containment.as_ref());
        state.codes.extend(held.codes);
        state.initialized = true;
        info!(
            replica = %self.replica,
            locks = state.locks.len(),
            codes = state.codes.len(),
            "replica cache loaded"
        );
        Ok(())
    }

    /// Loads the replica's held resources from the authority, once.
    pub fn bootstrap(&self, authority: &dyn RepositoryManager) -> Result<(), RegistryError> {
        if self.state.read().initialized {
            return Ok(());
        }
        let mut state = self.state.write();
        if state.initialized {
            return Ok(());
        }
        self.load(&mut state, authority)
    }

    /// Discards the cached state and loads it again from the authority.
    pub fn refresh(&self, authority: &dyn RepositoryManager) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        *state = CacheState::default();
        self.load(&mut state, authority)
    }

    /// Effective level held on `id`, including cover from an exclusive
    /// container or store.
    pub fn lock_level(&self, id: &LockableId) -> LockLevel {
        self.state.read().level(id)
    }

    pub fn holds_code(&self, code: &Code) -> bool {
        self.state.read().codes.contains(code)
    }

    /// Locks explicitly granted to this replica.
    pub fn held_locks(&self) -> LockRequest {
        self.state
            .read()
            .locks
            .iter()
            .map(|(id, level)| Lock::new(*id, *level))
            .collect()
    }

    pub fn held_codes(&self) -> CodeSet {
        self.state.read().codes.clone()
    }

    /// The part of `request` not already covered by held locks.
    pub fn cull(&self, request: &LockRequest) -> LockRequest {
        let state = self.state.read();
        let mut remaining = request.clone();
        remaining.retain(|lock| lock.level != LockLevel::None && !state.level(&lock.id).satisfies(lock.level));
        debug!(requested = request.len(), remaining = remaining.len(), "lock request culled");
        remaining
    }

    /// The codes in `codes` not already reserved by this replica.
    pub fn cull_codes(&self, codes: &CodeSet) -> CodeSet {
        let state = self.state.read();
        codes.difference(&state.codes).cloned().collect()
    }

    /// Records granted locks and the locks they imply.
    pub fn record_grant(&self, locks: &LockRequest) {
        self.state.write().record(locks, self.containment.as_ref());
    }

    /// Holds a newly created resource exclusively without asking the
    /// authority. Dropped by the next [`refresh`](Self::refresh).
    pub fn record_local_creation(&self, id: LockableId) {
        let mut state = self.state.write();
        state.local.insert(id);
        state.cover(&Lock::exclusive(id), self.containment.as_ref());
    }

    /// Whether `id` is held only because it was created locally.
    pub fn is_local(&self, id: &LockableId) -> bool {
        self.state.read().local.contains(id)
    }

    pub fn record_codes(&self, codes: &CodeSet) {
        self.state.write().codes.extend(codes.iter().cloned());
    }

    pub fn forget_codes(&self, codes: &CodeSet) {
        let mut state = self.state.write();
        for code in codes {
            state.codes.remove(code);
        }
    }

    /// Adds to `locks` the cached locks that a release cascades to.
    ///
    /// Releasing a container releases the cached locks on its objects;
    /// releasing the store releases every cached lock.
    pub fn expand_demotion(&self, locks: &LockRequest) -> LockRequest {
        let state = self.state.read();
        let mut expanded = locks.clone();
        let held = || state.locks.keys().chain(state.local.iter());

        for lock in locks.iter().filter(|l| l.level == LockLevel::None) {
            match lock.id.kind() {
                LockableKind::Store => {
                    for id in held() {
                        expanded.set(*id, LockLevel::None);
                    }
                }
                LockableKind::Container => {
                    let container = lock.id.id();
                    for id in held().filter(|id| id.kind() == LockableKind::Object) {
                        if self.containment.container_of(id.id()) == Some(container) {
                            expanded.set(*id, LockLevel::None);
                        }
                    }
                }
                LockableKind::Object => {}
            }
        }
        expanded
    }

    /// Applies an accepted demotion to the cache.
    pub fn record_demotion(&self, locks: &LockRequest) {
        let mut state = self.state.write();
        for lock in locks.iter() {
            match lock.level {
                LockLevel::None => {
                    state.locks.remove(&lock.id);
                    state.local.remove(&lock.id);
                    state.implied.remove(&lock.id);
                    state.drop_implied_by(&lock.id);
                }
                // The authority cannot share what it has never seen.
                LockLevel::Shared if state.local.contains(&lock.id) => {}
                LockLevel::Shared => {
                    if let Some(level) = state.locks.get_mut(&lock.id) {
                        if *level == LockLevel::Exclusive {
                            *level = LockLevel::Shared;
                        }
                    }
                    state.drop_implied_by(&lock.id);
                }
                LockLevel::Exclusive => {}
            }
        }
    }

    pub fn clear_locks(&self) {
        let mut state = self.state.write();
        state.locks.clear();
        state.implied.clear();
        state.local.clear();
    }

    pub fn clear_codes(&self) {
        self.state.write().codes.clear();
    }

    /// Releases every lock at the authority and empties the lock cache.
    pub fn relinquish_all(&self, authority: &dyn RepositoryManager) -> Result<RepositoryStatus, RegistryError> {
        let status = authority.relinquish(Resources::Locks, self.replica)?;
        if status.is_success() {
            self.clear_locks();
        }
        Ok(status)
    }
}
