// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Lockable resources, lock levels and lock requests.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Granularity of a lockable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LockableKind {
    /// The whole dataset.
    Store = 0,
    /// A container of objects.
    Container = 1,
    /// A single object.
    Object = 2,
}

impl LockableKind {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LockableKind::Store),
            1 => Some(LockableKind::Container),
            2 => Some(LockableKind::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockableKind::Store => "store",
            LockableKind::Container => "container",
            LockableKind::Object => "object",
        }
    }
}

impl fmt::Display for LockableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a lockable resource. Ordered by kind, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockableId {
    kind: LockableKind,
    id: u64,
}

impl LockableId {
    /// The id used for the single store-level resource.
    pub const STORE_ID: u64 = 1;

    /// The store-level resource.
    pub const STORE: LockableId = LockableId::new(LockableKind::Store, Self::STORE_ID);

    pub const fn new(kind: LockableKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub const fn container(id: u64) -> Self {
        Self::new(LockableKind::Container, id)
    }

    pub const fn object(id: u64) -> Self {
        Self::new(LockableKind::Object, id)
    }

    #[inline]
    pub fn kind(&self) -> LockableKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for LockableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A set of lockable ids.
pub type LockableIdSet = BTreeSet<LockableId>;

/// Lock level. Ordered `None < Shared < Exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LockLevel {
    /// Not held. In a demote request, release the lock.
    #[default]
    None,
    Shared,
    Exclusive,
}

impl LockLevel {
    #[inline]
    pub fn is_exclusive(self) -> bool {
        self == LockLevel::Exclusive
    }

    /// Returns true if holding `self` is enough to satisfy `wanted`.
    #[inline]
    pub fn satisfies(self, wanted: LockLevel) -> bool {
        self >= wanted
    }
}

/// A lock level on one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lock {
    pub id: LockableId,
    pub level: LockLevel,
}

impl Lock {
    pub const fn new(id: LockableId, level: LockLevel) -> Self {
        Self { id, level }
    }

    pub const fn shared(id: LockableId) -> Self {
        Self::new(id, LockLevel::Shared)
    }

    pub const fn exclusive(id: LockableId) -> Self {
        Self::new(id, LockLevel::Exclusive)
    }

    /// A release of `id`, used in demote requests.
    pub const fn released(id: LockableId) -> Self {
        Self::new(id, LockLevel::None)
    }
}

/// A set of locks, unique by resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockRequest {
    locks: BTreeMap<LockableId, LockLevel>,
}

impl LockRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a lock. If the resource is already present the higher level wins.
    pub fn insert(&mut self, lock: Lock) {
        let level = self.locks.entry(lock.id).or_insert(lock.level);
        if lock.level > *level {
            *level = lock.level;
        }
    }

    /// Sets the level for a resource, replacing any existing level.
    pub fn set(&mut self, id: LockableId, level: LockLevel) {
        self.locks.insert(id, level);
    }

    pub fn remove(&mut self, id: &LockableId) -> Option<LockLevel> {
        self.locks.remove(id)
    }

    /// Level requested for `id`, or `None` if absent.
    pub fn level(&self, id: &LockableId) -> LockLevel {
        self.locks.get(id).copied().unwrap_or_default()
    }

    pub fn contains(&self, id: &LockableId) -> bool {
        self.locks.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Lock> + '_ {
        self.locks.iter().map(|(id, level)| Lock::new(*id, *level))
    }

    pub fn ids(&self) -> impl Iterator<Item = &LockableId> + '_ {
        self.locks.keys()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Lock) -> bool) {
        self.locks.retain(|id, level| keep(&Lock::new(*id, *level)));
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn clear(&mut self) {
        self.locks.clear();
    }
}

impl FromIterator<Lock> for LockRequest {
    fn from_iter<I: IntoIterator<Item = Lock>>(iter: I) -> Self {
        let mut request = LockRequest::new();
        request.extend(iter);
        request
    }
}

impl Extend<Lock> for LockRequest {
    fn extend<I: IntoIterator<Item = Lock>>(&mut self, iter: I) {
        for lock in iter {
            self.insert(lock);
        }
    }
}
