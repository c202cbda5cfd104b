// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The interface between briefcases and the repository authority.
//!
//! A briefcase never touches the registry tables directly. It talks to a
//! [`RepositoryManager`], which the server-side
//! [`Authority`](crate::server::Authority) implements on top of the lock
//! and code registries.

mod error;
mod request;

pub use error::RegistryError;
pub use request::{Request, RepositoryStatus, Resources, Response, ResponseOptions};

use crate::resource::{CodeInfo, CodeSet, LockInfo, LockRequest, LockableIdSet, ReplicaId, RevisionId};

/// Locks and codes currently held by one replica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldResources {
    pub locks: LockRequest,
    pub codes: CodeSet,
}

/// Registry state of a batch of locks and codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStates {
    pub locks: Vec<LockInfo>,
    pub codes: Vec<CodeInfo>,
}

/// Operations the authority offers to replicas.
pub trait RepositoryManager: Send + Sync {
    /// Acquires locks and reserves codes in one all-or-nothing step.
    ///
    /// With `query_only` the request is evaluated without changing anything.
    fn process_request(
        &self,
        request: &Request,
        replica: ReplicaId,
        query_only: bool,
    ) -> Result<Response, RegistryError>;

    /// Lowers lock levels and releases codes.
    fn demote(
        &self,
        locks: &LockRequest,
        codes: &CodeSet,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError>;

    /// Drops every lock and/or code held by the replica.
    fn relinquish(&self, which: Resources, replica: ReplicaId) -> Result<RepositoryStatus, RegistryError>;

    fn query_held_resources(&self, replica: ReplicaId) -> Result<HeldResources, RegistryError>;

    fn query_states(&self, locks: &LockableIdSet, codes: &CodeSet) -> Result<ResourceStates, RegistryError>;

    /// Records the codes a pushed revision assigned and discarded.
    fn on_revision_committed(
        &self,
        assigned: &CodeSet,
        discarded: &CodeSet,
        revision: &RevisionId,
    ) -> Result<(), RegistryError>;
}
