// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Codes: globally unique, human-meaningful identifiers.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{ReplicaId, RevisionId};

/// Identifies the code specification (naming authority) a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeSpecId(pub u64);

impl fmt::Display for CodeSpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A code value within a spec and scope.
///
/// Values compare without regard to ASCII case, so `Pump-1` and `PUMP-1`
/// are the same code. Spec and scope must match exactly.
#[derive(Debug, Clone)]
pub struct Code {
    spec: CodeSpecId,
    scope: String,
    value: String,
}

impl Code {
    pub fn new(spec: CodeSpecId, scope: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            spec,
            scope: scope.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn spec(&self) -> CodeSpecId {
        self.spec
    }

    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Code {
    /// The value with ASCII letters lowered, as used for comparison.
    pub fn folded_value(&self) -> String {
        self.value.to_ascii_lowercase()
    }

    fn folded_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.value.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
            && self.scope == other.scope
            && self.value.eq_ignore_ascii_case(&other.value)
    }
}

impl Eq for Code {}

impl Ord for Code {
    fn cmp(&self, other: &Self) -> Ordering {
        self.spec
            .cmp(&other.spec)
            .then_with(|| self.scope.cmp(&other.scope))
            .then_with(|| self.folded_bytes().cmp(other.folded_bytes()))
    }
}

impl PartialOrd for Code {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Code {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.spec.hash(state);
        self.scope.hash(state);
        for b in self.folded_bytes() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.spec, self.scope, self.value)
    }
}

/// An ordered set of codes.
pub type CodeSet = BTreeSet<Code>;

/// Registry state of a code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CodeState {
    /// Nobody holds it and it has never been used.
    #[default]
    Available,
    /// Held by a replica, not yet used in a pushed revision.
    Reserved(ReplicaId),
    /// Assigned to an object in the given revision.
    Used(RevisionId),
    /// Was used, then discarded in the given revision. May be reserved again.
    Discarded(RevisionId),
}

impl CodeState {
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, CodeState::Available)
    }

    pub fn reserved_by(&self) -> Option<ReplicaId> {
        match self {
            CodeState::Reserved(replica) => Some(*replica),
            _ => None,
        }
    }

    /// The revision that used or discarded the code.
    pub fn revision(&self) -> Option<&RevisionId> {
        match self {
            CodeState::Used(rev) | CodeState::Discarded(rev) => Some(rev),
            _ => None,
        }
    }
}

/// A code together with its registry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInfo {
    pub code: Code,
    pub state: CodeState,
}

impl CodeInfo {
    pub fn new(code: Code, state: CodeState) -> Self {
        Self { code, state }
    }

    pub fn available(code: Code) -> Self {
        Self::new(code, CodeState::Available)
    }

    /// Returns true if `replica` could reserve this code now.
    pub fn is_available_to(&self, replica: ReplicaId) -> bool {
        match &self.state {
            CodeState::Available | CodeState::Discarded(_) => true,
            CodeState::Reserved(owner) => *owner == replica,
            CodeState::Used(_) => false,
        }
    }
}
