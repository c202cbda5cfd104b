// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Containment between the store, containers and objects, and the lock
//! rules that follow from it.

use std::collections::{BTreeMap, BTreeSet};

use crate::resource::{Lock, LockLevel, LockRequest, LockableId, LockableKind};

/// Read access to the object graph's containment structure.
pub trait ContainmentLookup: Send + Sync {
    /// Container holding `object`, if known.
    fn container_of(&self, object: u64) -> Option<u64>;

    /// Objects inside `container`.
    fn members_of(&self, container: u64) -> Vec<u64>;

    /// Every known container.
    fn containers(&self) -> Vec<u64>;
}

/// A containment map held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticContainment {
    members: BTreeMap<u64, BTreeSet<u64>>,
    parents: BTreeMap<u64, u64>,
}

impl StaticContainment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `object` in `container`, moving it if it was elsewhere.
    pub fn insert(&mut self, container: u64, object: u64) {
        if let Some(previous) = self.parents.insert(object, container) {
            if let Some(members) = self.members.get_mut(&previous) {
                members.remove(&object);
            }
        }
        self.members.entry(container).or_default().insert(object);
    }

    /// Adds an empty container.
    pub fn add_container(&mut self, container: u64) {
        self.members.entry(container).or_default();
    }

    pub fn with_members(mut self, container: u64, objects: impl IntoIterator<Item = u64>) -> Self {
        self.add_container(container);
        for object in objects {
            self.insert(container, object);
        }
        self
    }
}

impl ContainmentLookup for StaticContainment {
    fn container_of(&self, object: u64) -> Option<u64> {
        self.parents.get(&object).copied()
    }

    fn members_of(&self, container: u64) -> Vec<u64> {
        self.members
            .get(&container)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn containers(&self) -> Vec<u64> {
        self.members.keys().copied().collect()
    }
}

/// Locks a replica holds implicitly once `grant` is granted.
///
/// An exclusive container covers its objects; an exclusive store covers
/// every container and object.
pub fn implied_locks(grant: &Lock, lookup: &dyn ContainmentLookup) -> LockRequest {
    let mut implied = LockRequest::new();
    if !grant.level.is_exclusive() {
        return implied;
    }

    match grant.id.kind() {
        LockableKind::Container => {
            for object in lookup.members_of(grant.id.id()) {
                implied.insert(Lock::exclusive(LockableId::object(object)));
            }
        }
        LockableKind::Store => {
            for container in lookup.containers() {
                implied.insert(Lock::exclusive(LockableId::container(container)));
                for object in lookup.members_of(container) {
                    implied.insert(Lock::exclusive(LockableId::object(object)));
                }
            }
        }
        LockableKind::Object => {}
    }
    implied
}

/// Shared locks on the enclosing resources that `lock` depends on.
pub fn required_parent_locks(lock: &Lock, lookup: &dyn ContainmentLookup) -> LockRequest {
    let mut parents = LockRequest::new();
    if lock.level == LockLevel::None {
        return parents;
    }

    match lock.id.kind() {
        LockableKind::Object => {
            if let Some(container) = lookup.container_of(lock.id.id()) {
                parents.insert(Lock::shared(LockableId::container(container)));
            }
            parents.insert(Lock::shared(LockableId::STORE));
        }
        LockableKind::Container => {
            parents.insert(Lock::shared(LockableId::STORE));
        }
        LockableKind::Store => {}
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StaticContainment {
        StaticContainment::new()
            .with_members(1, [10, 11])
            .with_members(2, [20])
            .with_members(3, std::iter::empty())
    }

    #[test]
    fn test_lookup() {
        let graph = layout();
        assert_eq!(graph.container_of(11), Some(1));
        assert_eq!(graph.container_of(99), None);
        assert_eq!(graph.members_of(1), vec![10, 11]);
        assert!(graph.members_of(3).is_empty());
        assert_eq!(graph.containers(), vec![1, 2, 3]);
    }

    #[test]
    fn test_insert_moves_object() {
        let mut graph = layout();
        graph.insert(2, 10);
        assert_eq!(graph.container_of(10), Some(2));
        assert_eq!(graph.members_of(1), vec![11]);
        assert_eq!(graph.members_of(2), vec![10, 20]);
    }

    #[test]
    fn test_exclusive_container_implies_members() {
        let graph = layout();
        let implied = implied_locks(&Lock::exclusive(LockableId::container(1)), &graph);
        let ids: Vec<_> = implied.ids().copied().collect();
        assert_eq!(ids, vec![LockableId::object(10), LockableId::object(11)]);
        assert!(implied.iter().all(|l| l.level == LockLevel::Exclusive));
    }

    #[test]
    fn test_exclusive_store_implies_everything() {
        let graph = layout();
        let implied = implied_locks(&Lock::exclusive(LockableId::STORE), &graph);
        assert_eq!(implied.len(), 6);
        assert_eq!(implied.level(&LockableId::container(3)), LockLevel::Exclusive);
        assert_eq!(implied.level(&LockableId::object(20)), LockLevel::Exclusive);
    }

    #[test]
    fn test_shared_implies_nothing() {
        let graph = layout();
        assert!(implied_locks(&Lock::shared(LockableId::container(1)), &graph).is_empty());
        assert!(implied_locks(&Lock::exclusive(LockableId::object(10)), &graph).is_empty());
    }

    #[test]
    fn test_parent_locks() {
        let graph = layout();
        let parents = required_parent_locks(&Lock::exclusive(LockableId::object(20)), &graph);
        assert_eq!(parents.level(&LockableId::container(2)), LockLevel::Shared);
        assert_eq!(parents.level(&LockableId::STORE), LockLevel::Shared);
        assert_eq!(parents.len(), 2);

        let orphan = required_parent_locks(&Lock::shared(LockableId::object(99)), &graph);
        assert_eq!(orphan.len(), 1);

        let container = required_parent_locks(&Lock::exclusive(LockableId::container(1)), &graph);
        assert_eq!(container.ids().copied().collect::<Vec<_>>(), vec![LockableId::STORE]);

        assert!(required_parent_locks(&Lock::exclusive(LockableId::STORE), &graph).is_empty());
        assert!(required_parent_locks(&Lock::released(LockableId::object(10)), &graph).is_empty());
    }
}
