// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Resource model shared by the authority and the briefcases.
//!
//! Two kinds of resource are arbitrated: locks on [`LockableId`]s at a
//! [`LockLevel`], and [`Code`]s whose lifecycle is tracked as a
//! [`CodeState`].

mod code;
mod ids;
mod lockable;
mod ownership;

pub use code::{Code, CodeInfo, CodeSet, CodeSpecId, CodeState};
pub use ids::{ReplicaId, RevisionId};
pub use lockable::{Lock, LockLevel, LockRequest, LockableId, LockableIdSet, LockableKind};
pub use ownership::{LockInfo, LockOwnership};
