// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Briefcase Arbiter: lock and code arbitration for replicated briefcases
//!
//! Many briefcases edit replicas of one repository. Before changing an
//! element a briefcase takes a lock on it, and before assigning a
//! user-visible code it reserves that code, so that no two replicas make
//! conflicting changes. This crate provides both sides of that protocol:
//!
//! - [`server::Authority`]: the single arbiter, keeping lock and code
//!   registries in a transactional [`storage::RelationStore`]
//! - [`briefcase::Coordinator`]: the briefcase-side client, with a local
//!   cache of what it already holds
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use briefcase_arbiter::briefcase::{Coordinator, NoLocalChanges, StaticContainment};
//! use briefcase_arbiter::config::{CoordinatorConfig, StoreConfig};
//! use briefcase_arbiter::resource::{Code, CodeSpecId, Lock, LockableId, ReplicaId};
//! use briefcase_arbiter::server::Authority;
//! use briefcase_arbiter::Request;
//!
//! let authority = Arc::new(Authority::open(&StoreConfig::at_path("/tmp/arbiter")).unwrap());
//! let graph = Arc::new(StaticContainment::new().with_members(1, [10]));
//! let briefcase = Coordinator::new(
//!     ReplicaId(1),
//!     authority,
//!     graph,
//!     Arc::new(NoLocalChanges),
//!     CoordinatorConfig::default(),
//! );
//!
//! let request = Request::new(
//!     std::iter::once(Lock::exclusive(LockableId::object(10))).collect(),
//!     std::iter::once(Code::new(CodeSpecId(1), "", "PUMP-001")).collect(),
//! );
//! let response = briefcase.process(&request, false).unwrap();
//! assert!(response.is_success());
//! ```

pub mod briefcase;
pub mod config;
pub mod repository;
pub mod resource;
pub mod server;
pub mod storage;

pub use briefcase::{Coordinator, ReplicaCache};
pub use config::{CoordinatorConfig, StoreConfig};
pub use repository::{
    RegistryError, RepositoryManager, RepositoryStatus, Request, Resources, Response,
    ResponseOptions,
};
pub use resource::{Code, CodeState, Lock, LockLevel, LockRequest, LockableId, ReplicaId};
pub use server::Authority;
pub use storage::{RelationStore, StorageError};
