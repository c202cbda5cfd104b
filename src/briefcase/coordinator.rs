// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The briefcase-side entry point for acquiring and releasing resources.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::CoordinatorConfig;
use crate::repository::{
    HeldResources, RegistryError, RepositoryManager, RepositoryStatus, Request, Resources,
    ResourceStates, Response,
};
use crate::resource::{
    CodeSet, Lock, LockLevel, LockOwnership, LockRequest, LockableId, LockableIdSet, LockableKind,
    ReplicaId, RevisionId,
};

use super::cache::ReplicaCache;
use super::containment::{required_parent_locks, ContainmentLookup};
use super::local::LocalChanges;

/// Routes a briefcase's lock and code requests through its cache to the
/// authority.
///
/// Requests already satisfied by cached grants never leave the briefcase,
/// so a disconnected coordinator can still answer them.
pub struct Coordinator {
    replica: ReplicaId,
    authority: Option<Arc<dyn RepositoryManager>>,
    containment: Arc<dyn ContainmentLookup>,
    changes: Arc<dyn LocalChanges>,
    cache: ReplicaCache,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(
        replica: ReplicaId,
        authority: Arc<dyn RepositoryManager>,
        containment: Arc<dyn ContainmentLookup>,
        changes: Arc<dyn LocalChanges>,
        config: CoordinatorConfig,
    ) -> Self {
        Self::build(replica, Some(authority), containment, changes, config)
    }

    /// A coordinator with no authority to talk to.
    pub fn disconnected(
        replica: ReplicaId,
        containment: Arc<dyn ContainmentLookup>,
        changes: Arc<dyn LocalChanges>,
        config: CoordinatorConfig,
    ) -> Self {
        Self::build(replica, None, containment, changes, config)
    }

    fn build(
        replica: ReplicaId,
        authority: Option<Arc<dyn RepositoryManager>>,
        containment: Arc<dyn ContainmentLookup>,
        changes: Arc<dyn LocalChanges>,
        config: CoordinatorConfig,
    ) -> Self {
        let cache = ReplicaCache::new(replica, Arc::clone(&containment));
        Self {
            replica,
            authority,
            containment,
            changes,
            cache,
            config,
        }
    }

    #[inline]
    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    pub fn cache(&self) -> &ReplicaCache {
        &self.cache
    }

    pub fn is_connected(&self) -> bool {
        self.authority.is_some()
    }

    /// The authority, with the cache loaded from it.
    fn connected(&self) -> Result<&dyn RepositoryManager, RegistryError> {
        let authority = self
            .authority
            .as_deref()
            .ok_or(RegistryError::ServerUnavailable)?;
        self.cache.bootstrap(authority)?;
        Ok(authority)
    }

    /// Adds the parent locks each lock in `locks` depends on and the cache
    /// does not already cover.
    fn with_parent_locks(&self, locks: &LockRequest) -> LockRequest {
        let mut expanded = locks.clone();
        for lock in locks.iter() {
            for parent in required_parent_locks(&lock, self.containment.as_ref()).iter() {
                if !self.cache.lock_level(&parent.id).satisfies(parent.level) {
                    expanded.insert(parent);
                }
            }
        }
        expanded
    }

    /// Acquires the locks and reserves the codes in `request`.
    ///
    /// With `query_only`, reports whether the request would be granted
    /// without acquiring anything.
    #[instrument(skip(self, request), fields(replica = %self.replica, locks = request.locks.len(), codes = request.codes.len()))]
    pub fn process(&self, request: &Request, query_only: bool) -> Result<Response, RegistryError> {
        if let Some(authority) = self.authority.as_deref() {
            self.cache.bootstrap(authority)?;
        }

        let mut locks = self.cache.cull(&request.locks);
        if self.config.expand_parent_locks {
            locks = self.with_parent_locks(&locks);
        }
        let codes = self.cache.cull_codes(&request.codes);

        if locks.is_empty() && codes.is_empty() {
            return Ok(Response::success());
        }

        let authority = self.connected()?;
        let forwarded = Request {
            locks,
            codes,
            options: request.options | self.config.response_options,
        };
        let response = authority.process_request(&forwarded, self.replica, query_only)?;

        if response.is_success() {
            if !query_only {
                self.cache.record_grant(&forwarded.locks);
                self.cache.record_codes(&forwarded.codes);
                info!(
                    locks = forwarded.locks.len(),
                    codes = forwarded.codes.len(),
                    "request granted"
                );
            }
        } else {
            warn!(status = %response.status, "request denied");
        }
        Ok(response)
    }

    pub fn acquire_locks(&self, locks: &LockRequest) -> Result<Response, RegistryError> {
        self.process(&Request::new(locks.clone(), CodeSet::new()), false)
    }

    pub fn reserve_codes(&self, codes: &CodeSet) -> Result<Response, RegistryError> {
        self.process(&Request::new(LockRequest::new(), codes.clone()), false)
    }

    /// Reports whether `request` would be granted, acquiring nothing.
    pub fn are_available(&self, request: &Request) -> Result<Response, RegistryError> {
        self.process(request, true)
    }

    /// Lowers lock levels and releases codes.
    ///
    /// Releasing a container or the store also releases the cached locks
    /// beneath it.
    #[instrument(skip(self, locks, codes), fields(replica = %self.replica, locks = locks.len(), codes = codes.len()))]
    pub fn demote(&self, locks: &LockRequest, codes: &CodeSet) -> Result<RepositoryStatus, RegistryError> {
        let authority = self.connected()?;

        if self.changes.has_pending_changes() {
            warn!("demote refused: local changes pending");
            return Ok(RepositoryStatus::PendingTransactions);
        }

        let expanded = self.cache.expand_demotion(locks);
        let locks_in_use = self.changes.locks_in_use();
        if let Some(used) = expanded
            .iter()
            .find(|l| l.level == LockLevel::None && locks_in_use.contains(&l.id))
        {
            warn!(resource = %used.id, "demote refused: lock in use");
            return Ok(RepositoryStatus::LockUsed);
        }

        let codes_in_use = self.changes.codes_in_use();
        if let Some(used) = codes.intersection(&codes_in_use).next() {
            warn!(code = %used, "demote refused: code in use");
            return Ok(RepositoryStatus::CodeUsed);
        }

        let status = authority.demote(&expanded, codes, self.replica)?;
        if status.is_success() {
            self.cache.record_demotion(&expanded);
            self.cache.forget_codes(codes);
        }
        Ok(status)
    }

    /// Records a resource created in this briefcase.
    ///
    /// The shared parent locks are taken through the authority; the new
    /// resource itself is held exclusively in the cache only, until the next
    /// [`refresh`](Self::refresh).
    #[instrument(skip(self), fields(replica = %self.replica))]
    pub fn record_local_creation(&self, id: LockableId) -> Result<Response, RegistryError> {
        let parents = required_parent_locks(&Lock::exclusive(id), self.containment.as_ref());
        let response = self.acquire_locks(&parents)?;
        if response.is_success() {
            self.cache.record_local_creation(id);
            debug!(resource = %id, "locally created resource held");
        }
        Ok(response)
    }

    pub fn release_codes(&self, codes: &CodeSet) -> Result<RepositoryStatus, RegistryError> {
        self.demote(&LockRequest::new(), codes)
    }

    /// Gives up every held lock and/or code.
    #[instrument(skip(self), fields(replica = %self.replica))]
    pub fn relinquish(&self, which: Resources) -> Result<RepositoryStatus, RegistryError> {
        let authority = self.connected()?;

        if self.changes.has_pending_changes() {
            warn!("relinquish refused: local changes pending");
            return Ok(RepositoryStatus::PendingTransactions);
        }
        if which.includes_locks() && !self.changes.locks_in_use().is_empty() {
            warn!("relinquish refused: locks in use");
            return Ok(RepositoryStatus::LockUsed);
        }
        if which.includes_codes() {
            let held = self.cache.held_codes();
            if self.changes.codes_in_use().iter().any(|c| held.contains(c)) {
                warn!("relinquish refused: codes in use");
                return Ok(RepositoryStatus::CodeUsed);
            }
        }

        if which == Resources::Locks {
            return self.cache.relinquish_all(authority);
        }

        let status = authority.relinquish(which, self.replica)?;
        if status.is_success() {
            if which.includes_locks() {
                self.cache.clear_locks();
            }
            self.cache.clear_codes();
        }
        Ok(status)
    }

    pub fn relinquish_locks(&self) -> Result<RepositoryStatus, RegistryError> {
        self.relinquish(Resources::Locks)
    }

    pub fn relinquish_codes(&self) -> Result<RepositoryStatus, RegistryError> {
        self.relinquish(Resources::Codes)
    }

    /// What the authority records as held by this replica.
    pub fn query_held_resources(&self) -> Result<HeldResources, RegistryError> {
        self.connected()?.query_held_resources(self.replica)
    }

    pub fn query_states(&self, locks: &LockableIdSet, codes: &CodeSet) -> Result<ResourceStates, RegistryError> {
        self.connected()?.query_states(locks, codes)
    }

    /// Effective level this replica holds on `id`.
    pub fn lock_level(&self, id: &LockableId) -> Result<LockLevel, RegistryError> {
        if let Some(authority) = self.authority.as_deref() {
            self.cache.bootstrap(authority)?;
        }
        Ok(self.cache.lock_level(id))
    }

    /// Reloads the cache from the authority.
    pub fn refresh(&self) -> Result<(), RegistryError> {
        let authority = self
            .authority
            .as_deref()
            .ok_or(RegistryError::ServerUnavailable)?;
        self.cache.refresh(authority)
    }

    /// Removes from `request` what `response` says cannot be granted, so
    /// the remainder can be retried.
    ///
    /// Locks held exclusively by another replica are dropped, along with
    /// objects inside such a container. Exclusive requests on resources
    /// shared by others are lowered to shared. Unavailable codes are dropped.
    pub fn reformulate(&self, request: &mut Request, response: &Response) {
        let mut removed: BTreeSet<LockableId> = BTreeSet::new();

        for info in &response.lock_states {
            match &info.ownership {
                LockOwnership::Exclusive(owner) if *owner != self.replica => {
                    request.locks.remove(&info.id);
                    removed.insert(info.id);
                }
                LockOwnership::Shared(owners) if owners.iter().any(|o| *o != self.replica) => {
                    if request.locks.level(&info.id) == LockLevel::Exclusive {
                        request.locks.set(info.id, LockLevel::Shared);
                    }
                }
                _ => {}
            }
        }

        if removed.contains(&LockableId::STORE) {
            request.locks.clear();
        } else if !removed.is_empty() {
            let containment = self.containment.as_ref();
            request.locks.retain(|lock| {
                lock.id.kind() != LockableKind::Object
                    || !containment
                        .container_of(lock.id.id())
                        .map_or(false, |c| removed.contains(&LockableId::container(c)))
            });
        }

        for info in &response.code_states {
            if !info.is_available_to(self.replica) {
                request.codes.remove(&info.code);
            }
        }
    }

    /// Records the codes a pushed revision assigned and discarded, and
    /// drops them from the cache.
    #[instrument(skip(self, assigned, discarded, revision), fields(replica = %self.replica, revision = %revision))]
    pub fn push_revision(
        &self,
        assigned: &CodeSet,
        discarded: &CodeSet,
        revision: &RevisionId,
    ) -> Result<(), RegistryError> {
        let authority = self.connected()?;
        authority.on_revision_committed(assigned, discarded, revision)?;
        self.cache.forget_codes(assigned);
        self.cache.forget_codes(discarded);
        Ok(())
    }
}
