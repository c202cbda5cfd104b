// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Briefcase-side coordination.
//!
//! A [`Coordinator`] sits between a briefcase and the authority. It keeps a
//! [`ReplicaCache`] of what the briefcase already holds, adds the parent
//! locks implied by the object graph's containment, and refuses to release
//! anything that unpushed [`LocalChanges`] still rely on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use briefcase_arbiter::briefcase::{Coordinator, NoLocalChanges, StaticContainment};
//! use briefcase_arbiter::config::CoordinatorConfig;
//! use briefcase_arbiter::resource::{Lock, LockableId, ReplicaId};
//! use briefcase_arbiter::server::Authority;
//!
//! let authority = Arc::new(Authority::in_memory().unwrap());
//! let graph = Arc::new(StaticContainment::new().with_members(1, [10, 11]));
//! let coordinator = Coordinator::new(
//!     ReplicaId(7),
//!     authority,
//!     graph,
//!     Arc::new(NoLocalChanges),
//!     CoordinatorConfig::default(),
//! );
//!
//! let locks = std::iter::once(Lock::exclusive(LockableId::object(10))).collect();
//! assert!(coordinator.acquire_locks(&locks).unwrap().is_success());
//! ```

mod cache;
mod containment;
mod coordinator;
mod local;

pub use cache::ReplicaCache;
pub use containment::{implied_locks, required_parent_locks, ContainmentLookup, StaticContainment};
pub use coordinator::Coordinator;
pub use local::{LocalChanges, NoLocalChanges, TrackedChanges};
