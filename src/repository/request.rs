// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Requests, responses and statuses exchanged with the authority.

use std::fmt;

use crate::resource::{CodeInfo, CodeSet, LockInfo, LockRequest};

/// Terminal status of a repository call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryStatus {
    Success,
    /// A requested lock conflicts with one held by another replica.
    LockAlreadyHeld,
    /// A requested code is reserved by another replica or already used.
    CodeUnavailable,
    /// A code being released is not reserved by the caller.
    CodeNotReserved,
    /// The replica has local changes not yet pushed.
    PendingTransactions,
    /// A lock being released protects local changes.
    LockUsed,
    /// A code being released is used by local changes.
    CodeUsed,
    /// Registry state is inconsistent or unreadable.
    SyncError,
    ServerUnavailable,
}

impl RepositoryStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        self == RepositoryStatus::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryStatus::Success => "success",
            RepositoryStatus::LockAlreadyHeld => "lock already held",
            RepositoryStatus::CodeUnavailable => "code unavailable",
            RepositoryStatus::CodeNotReserved => "code not reserved",
            RepositoryStatus::PendingTransactions => "pending transactions",
            RepositoryStatus::LockUsed => "lock used",
            RepositoryStatus::CodeUsed => "code used",
            RepositoryStatus::SyncError => "sync error",
            RepositoryStatus::ServerUnavailable => "server unavailable",
        }
    }
}

impl fmt::Display for RepositoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Detail the authority attaches to a denied response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResponseOptions: u8 {
        /// Report the ownership of each conflicting lock.
        const LOCK_STATE = 1 << 0;
        /// Report the state of each unavailable code.
        const CODE_STATE = 1 << 1;
    }
}

impl ResponseOptions {
    pub const NONE: ResponseOptions = ResponseOptions::empty();
    pub const ALL: ResponseOptions = ResponseOptions::all();
}

/// Which held resources a relinquish call drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resources {
    Locks,
    Codes,
    All,
}

impl Resources {
    #[inline]
    pub fn includes_locks(self) -> bool {
        matches!(self, Resources::Locks | Resources::All)
    }

    #[inline]
    pub fn includes_codes(self) -> bool {
        matches!(self, Resources::Codes | Resources::All)
    }
}

/// Locks and codes requested together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub locks: LockRequest,
    pub codes: CodeSet,
    pub options: ResponseOptions,
}

impl Request {
    pub fn new(locks: LockRequest, codes: CodeSet) -> Self {
        Self {
            locks,
            codes,
            options: ResponseOptions::NONE,
        }
    }

    pub fn with_options(mut self, options: ResponseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty() && self.codes.is_empty()
    }
}

/// Result of a request: a status plus optional denial detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: RepositoryStatus,
    /// Ownership of conflicting locks, when [`ResponseOptions::LOCK_STATE`] was set.
    pub lock_states: Vec<LockInfo>,
    /// State of unavailable codes, when [`ResponseOptions::CODE_STATE`] was set.
    pub code_states: Vec<CodeInfo>,
}

impl Response {
    pub fn new(status: RepositoryStatus) -> Self {
        Self {
            status,
            lock_states: Vec::new(),
            code_states: Vec::new(),
        }
    }

    pub fn success() -> Self {
        Self::new(RepositoryStatus::Success)
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
