// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Local changes a briefcase has made but not yet pushed.

use parking_lot::RwLock;

use crate::resource::{Code, CodeSet, LockableId, LockableIdSet};

/// What the local editing session is relying on.
///
/// Releasing a lock or code that local changes depend on would let another
/// replica invalidate work that has not been pushed yet.
pub trait LocalChanges: Send + Sync {
    /// True if there are local transactions not yet pushed.
    fn has_pending_changes(&self) -> bool;

    /// Resources modified by local changes.
    fn locks_in_use(&self) -> LockableIdSet;

    /// Codes assigned by local changes.
    fn codes_in_use(&self) -> CodeSet;
}

/// A briefcase with nothing to push.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalChanges;

impl LocalChanges for NoLocalChanges {
    fn has_pending_changes(&self) -> bool {
        false
    }

    fn locks_in_use(&self) -> LockableIdSet {
        LockableIdSet::new()
    }

    fn codes_in_use(&self) -> CodeSet {
        CodeSet::new()
    }
}

#[derive(Debug, Default)]
struct TrackedState {
    pending: bool,
    locks: LockableIdSet,
    codes: CodeSet,
}

/// In-memory record of local changes, updated by the editing session.
#[derive(Debug, Default)]
pub struct TrackedChanges {
    state: RwLock<TrackedState>,
}

impl TrackedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pending(&self, pending: bool) {
        self.state.write().pending = pending;
    }

    /// Records that local changes modified `id`.
    pub fn mark_lock_used(&self, id: LockableId) {
        self.state.write().locks.insert(id);
    }

    /// Records that local changes assigned `code`.
    pub fn mark_code_used(&self, code: Code) {
        self.state.write().codes.insert(code);
    }

    /// Forgets everything, as after a successful push.
    pub fn clear(&self) {
        *self.state.write() = TrackedState::default();
    }
}

impl LocalChanges for TrackedChanges {
    fn has_pending_changes(&self) -> bool {
        self.state.read().pending
    }

    fn locks_in_use(&self) -> LockableIdSet {
        self.state.read().locks.clone()
    }

    fn codes_in_use(&self) -> CodeSet {
        self.state.read().codes.clone()
    }
}
