// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Server-side registries.
//!
//! The [`LockRegistry`] and [`CodeRegistry`] each own one table of the
//! shared [`RelationStore`](crate::storage::RelationStore). The
//! [`RevisionSynchronizer`] applies pushed revisions to the code table, and
//! the [`Authority`] puts all three behind the
//! [`RepositoryManager`](crate::repository::RepositoryManager) interface.
//!
//! # Example
//!
//! ```no_run
//! use briefcase_arbiter::repository::{RepositoryManager, Request, ResponseOptions};
//! use briefcase_arbiter::resource::{Lock, LockableId, ReplicaId};
//! use briefcase_arbiter::server::Authority;
//!
//! let authority = Authority::in_memory().unwrap();
//! let locks = std::iter::once(Lock::exclusive(LockableId::object(42))).collect();
//! let request = Request::new(locks, Default::default()).with_options(ResponseOptions::ALL);
//!
//! let response = authority.process_request(&request, ReplicaId(1), false).unwrap();
//! assert!(response.is_success());
//! ```

mod authority;
mod code_registry;
mod lock_registry;
mod revision;

pub use authority::Authority;
pub use code_registry::{CodeRegistry, CODES_TABLE};
pub use lock_registry::{LockRegistry, LOCKS_TABLE};
pub use revision::RevisionSynchronizer;
