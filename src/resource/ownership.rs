// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Aggregated lock ownership.

use std::collections::BTreeSet;

use super::{LockLevel, LockableId, ReplicaId};

/// Who holds a lockable resource.
///
/// Either one exclusive owner, or any number of shared owners. An empty
/// shared set means the resource is unowned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOwnership {
    Exclusive(ReplicaId),
    Shared(BTreeSet<ReplicaId>),
}

impl Default for LockOwnership {
    fn default() -> Self {
        LockOwnership::Shared(BTreeSet::new())
    }
}

impl LockOwnership {
    /// Highest level held by anyone.
    pub fn level(&self) -> LockLevel {
        match self {
            LockOwnership::Exclusive(_) => LockLevel::Exclusive,
            LockOwnership::Shared(owners) if owners.is_empty() => LockLevel::None,
            LockOwnership::Shared(_) => LockLevel::Shared,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.level() != LockLevel::None
    }

    pub fn exclusive_owner(&self) -> Option<ReplicaId> {
        match self {
            LockOwnership::Exclusive(owner) => Some(*owner),
            LockOwnership::Shared(_) => None,
        }
    }

    /// Shared owners; empty when held exclusively.
    pub fn shared_owners(&self) -> impl Iterator<Item = &ReplicaId> + '_ {
        let owners = match self {
            LockOwnership::Shared(owners) => Some(owners),
            LockOwnership::Exclusive(_) => None,
        };
        owners.into_iter().flatten()
    }

    /// Level held by `replica`.
    pub fn level_of(&self, replica: ReplicaId) -> LockLevel {
        match self {
            LockOwnership::Exclusive(owner) if *owner == replica => LockLevel::Exclusive,
            LockOwnership::Shared(owners) if owners.contains(&replica) => LockLevel::Shared,
            _ => LockLevel::None,
        }
    }

    /// Returns true if a replica other than `replica` holds any level.
    pub fn held_by_other(&self, replica: ReplicaId) -> bool {
        match self {
            LockOwnership::Exclusive(owner) => *owner != replica,
            LockOwnership::Shared(owners) => owners.iter().any(|o| *o != replica),
        }
    }

    /// Records an exclusive owner. Fails if anyone already owns the resource.
    pub fn add_exclusive(&mut self, owner: ReplicaId) -> Result<(), String> {
        if self.is_owned() {
            return Err(format!(
                "exclusive owner {} alongside existing {:?}",
                owner, self
            ));
        }
        *self = LockOwnership::Exclusive(owner);
        Ok(())
    }

    /// Records a shared owner. Fails if the resource is held exclusively.
    pub fn add_shared(&mut self, owner: ReplicaId) -> Result<(), String> {
        match self {
            LockOwnership::Exclusive(existing) => Err(format!(
                "shared owner {} alongside exclusive owner {}",
                owner, existing
            )),
            LockOwnership::Shared(owners) => {
                owners.insert(owner);
                Ok(())
            }
        }
    }
}

/// The ownership of one resource as reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub id: LockableId,
    pub ownership: LockOwnership,
    /// Set when the resource is owned by anyone.
    pub tracked: bool,
}

impl LockInfo {
    pub fn new(id: LockableId, ownership: LockOwnership) -> Self {
        let tracked = ownership.is_owned();
        Self {
            id,
            ownership,
            tracked,
        }
    }

    pub fn unowned(id: LockableId) -> Self {
        Self::new(id, LockOwnership::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unowned_default() {
        let ownership = LockOwnership::default();
        assert_eq!(ownership.level(), LockLevel::None);
        assert!(!ownership.is_owned());
        assert!(!LockInfo::unowned(LockableId::object(1)).tracked);
    }

    #[test]
    fn test_shared_owners_accumulate() {
        let mut ownership = LockOwnership::default();
        ownership.add_shared(ReplicaId(1)).unwrap();
        ownership.add_shared(ReplicaId(2)).unwrap();
        assert_eq!(ownership.level(), LockLevel::Shared);
        assert_eq!(ownership.shared_owners().count(), 2);
        assert_eq!(ownership.level_of(ReplicaId(2)), LockLevel::Shared);
        assert_eq!(ownership.level_of(ReplicaId(3)), LockLevel::None);
        assert!(ownership.held_by_other(ReplicaId(1)));
    }

    #[test]
    fn test_exclusive_rejects_others() {
        let mut ownership = LockOwnership::default();
        ownership.add_exclusive(ReplicaId(1)).unwrap();
        assert_eq!(ownership.exclusive_owner(), Some(ReplicaId(1)));
        assert!(!ownership.held_by_other(ReplicaId(1)));
        assert!(ownership.add_shared(ReplicaId(2)).is_err());
        assert!(ownership.add_exclusive(ReplicaId(2)).is_err());
    }

    #[test]
    fn test_exclusive_after_shared_rejected() {
        let mut ownership = LockOwnership::default();
        ownership.add_shared(ReplicaId(1)).unwrap();
        assert!(ownership.add_exclusive(ReplicaId(2)).is_err());
    }

    #[test]
    fn test_info_tracked_when_owned() {
        let info = LockInfo::new(
            LockableId::container(3),
            LockOwnership::Exclusive(ReplicaId(9)),
        );
        assert!(info.tracked);
    }
}
