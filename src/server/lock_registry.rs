// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Lock registry: who holds which lock, at which level.
//!
//! One row per `(resource, owner)`:
//!
//! ```text
//! key:   [kind:u8][id:u64 BE][owner:u32 BE]
//! value: [exclusive:u8]
//! ```
//!
//! Rows for one resource are contiguous, so the ownership of a resource is
//! a single prefix scan. A request by replica R conflicts with a row held
//! by R2 when R2 is not R and either side is exclusive. The whole request
//! is checked before anything is written.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::repository::{RegistryError, RepositoryStatus, Response, ResponseOptions};
use crate::resource::{
    Lock, LockInfo, LockLevel, LockOwnership, LockRequest, LockableId, LockableIdSet,
    LockableKind, ReplicaId,
};
use crate::storage::{
    RelationStore, Row, RowKeyReader, RowKeyWriter, StorageError, StoreTxn, Table, VirtualSet,
};

/// Table holding lock ownership rows.
pub const LOCKS_TABLE: Table = Table::new(1, "locks");

/// One decoded ownership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockRow {
    id: LockableId,
    owner: ReplicaId,
    exclusive: bool,
}

impl LockRow {
    fn decode(row: &Row) -> Result<Self, StorageError> {
        Self::decode_parts(&row.key, &row.value)
    }

    fn decode_parts(key: &[u8], value: &[u8]) -> Result<Self, StorageError> {
        let mut key = RowKeyReader::new(key);
        let kind_byte = key.u8()?;
        let kind = LockableKind::from_u8(kind_byte).ok_or_else(|| {
            StorageError::Corruption(format!("unknown lockable kind {}", kind_byte))
        })?;
        let id = key.u64()?;
        let owner = ReplicaId(key.u32()?);
        key.finish()?;

        Ok(Self {
            id: LockableId::new(kind, id),
            owner,
            exclusive: decode_exclusive(value)?,
        })
    }
}

fn resource_prefix(id: LockableId) -> Vec<u8> {
    RowKeyWriter::new().u8(id.kind().as_u8()).u64(id.id()).finish()
}

fn row_key(id: LockableId, owner: ReplicaId) -> Vec<u8> {
    RowKeyWriter::new()
        .u8(id.kind().as_u8())
        .u64(id.id())
        .u32(owner.0)
        .finish()
}

fn encode_exclusive(exclusive: bool) -> Vec<u8> {
    RowKeyWriter::new().u8(u8::from(exclusive)).finish()
}

fn decode_exclusive(value: &[u8]) -> Result<bool, StorageError> {
    let mut reader = RowKeyReader::new(value);
    let flag = reader.u8()?;
    reader.finish()?;
    Ok(flag != 0)
}

fn owner_of_key(key: &[u8]) -> Result<ReplicaId, StorageError> {
    let mut reader = RowKeyReader::new(key);
    reader.u8()?;
    reader.u64()?;
    Ok(ReplicaId(reader.u32()?))
}

/// Folds the rows of one resource into its ownership.
///
/// An exclusive row next to any other row is a registry inconsistency.
fn aggregate(id: LockableId, rows: &[LockRow]) -> Result<LockInfo, RegistryError> {
    let mut ownership = LockOwnership::default();
    for row in rows {
        let added = if row.exclusive {
            ownership.add_exclusive(row.owner)
        } else {
            ownership.add_shared(row.owner)
        };
        if let Err(detail) = added {
            error!(resource = %id, detail = %detail, "lock ownership invariant violated");
            return Err(RegistryError::Sync(format!("{}: {}", id, detail)));
        }
    }
    Ok(LockInfo::new(id, ownership))
}

/// Rows of other replicas that conflict with a request.
struct Conflicting<'a> {
    request: &'a LockRequest,
    replica: ReplicaId,
}

impl VirtualSet for Conflicting<'_> {
    fn is_in_set(&self, key: &[u8], value: &[u8]) -> Result<bool, StorageError> {
        let row = LockRow::decode_parts(key, value)?;
        let wanted = self.request.level(&row.id);
        Ok(row.owner != self.replica
            && wanted != LockLevel::None
            && (wanted.is_exclusive() || row.exclusive))
    }
}

/// Result of checking a lock request against the registry.
#[derive(Debug)]
pub(crate) struct LockEvaluation {
    pub status: RepositoryStatus,
    /// Ownership of each conflicting resource, if requested.
    pub denied: Vec<LockInfo>,
}

/// Server-side registry of lock ownership.
pub struct LockRegistry {
    store: Arc<RelationStore>,
}

impl LockRegistry {
    /// Creates the registry, creating its table on first use.
    pub fn new(store: Arc<RelationStore>) -> Result<Self, StorageError> {
        store.create_table(LOCKS_TABLE)?;
        Ok(Self { store })
    }

    pub(crate) fn begin(&self) -> Result<StoreTxn<'_>, StorageError> {
        self.store.begin(&[LOCKS_TABLE])
    }

    fn rows_for(&self, txn: &StoreTxn<'_>, id: LockableId) -> Result<Vec<LockRow>, StorageError> {
        txn.scan(LOCKS_TABLE, &resource_prefix(id))?
            .iter()
            .map(LockRow::decode)
            .collect()
    }

    /// Checks `request` for conflicts without writing.
    pub(crate) fn evaluate_in(
        &self,
        txn: &StoreTxn<'_>,
        request: &LockRequest,
        replica: ReplicaId,
        options: ResponseOptions,
    ) -> Result<LockEvaluation, RegistryError> {
        // Without per-resource detail, one pass over the set answers it.
        if !options.contains(ResponseOptions::LOCK_STATE) {
            let conflicting = Conflicting { request, replica };
            let status = if txn.any_in_set(LOCKS_TABLE, &conflicting)? {
                warn!(requested = request.len(), "lock request denied");
                RepositoryStatus::LockAlreadyHeld
            } else {
                RepositoryStatus::Success
            };
            return Ok(LockEvaluation {
                status,
                denied: Vec::new(),
            });
        }

        let mut status = RepositoryStatus::Success;
        let mut denied = Vec::new();

        for lock in request.iter() {
            if lock.level == LockLevel::None {
                continue;
            }

            let rows = self.rows_for(txn, lock.id)?;
            let conflict = rows
                .iter()
                .any(|row| row.owner != replica && (lock.level.is_exclusive() || row.exclusive));

            if conflict {
                warn!(resource = %lock.id, requested = ?lock.level, "lock denied");
                status = RepositoryStatus::LockAlreadyHeld;
                denied.push(aggregate(lock.id, &rows)?);
            }
        }

        Ok(LockEvaluation { status, denied })
    }

    /// Writes the rows for an already-evaluated request.
    pub(crate) fn apply_in(
        &self,
        txn: &mut StoreTxn<'_>,
        request: &LockRequest,
        replica: ReplicaId,
    ) -> Result<usize, RegistryError> {
        let mut changed = 0;

        for lock in request.iter() {
            if lock.level == LockLevel::None {
                continue;
            }

            let key = row_key(lock.id, replica);
            match txn.get(LOCKS_TABLE, &key)? {
                None => {
                    txn.put(LOCKS_TABLE, key, encode_exclusive(lock.level.is_exclusive()))?;
                    debug!(resource = %lock.id, level = ?lock.level, "lock row inserted");
                    changed += 1;
                }
                Some(value) => {
                    if lock.level.is_exclusive() && !decode_exclusive(&value)? {
                        txn.put(LOCKS_TABLE, key, encode_exclusive(true))?;
                        debug!(resource = %lock.id, "lock upgraded to exclusive");
                        changed += 1;
                    }
                }
            }
        }

        if changed > 0 {
            info!(replica = %replica, changed, "locks granted");
        }
        Ok(changed)
    }

    /// Lowers or releases the replica's locks. Never raises a level.
    pub(crate) fn demote_in(
        &self,
        txn: &mut StoreTxn<'_>,
        locks: &LockRequest,
        replica: ReplicaId,
    ) -> Result<usize, RegistryError> {
        let mut changed = 0;

        for lock in locks.iter() {
            let key = row_key(lock.id, replica);
            let Some(value) = txn.get(LOCKS_TABLE, &key)? else {
                continue;
            };

            let held_exclusive = decode_exclusive(&value)?;
            match lock.level {
                LockLevel::None => {
                    txn.delete(LOCKS_TABLE, &key)?;
                    debug!(resource = %lock.id, "lock released");
                    changed += 1;
                }
                LockLevel::Shared if held_exclusive => {
                    txn.put(LOCKS_TABLE, key, encode_exclusive(false))?;
                    debug!(resource = %lock.id, "lock reduced to shared");
                    changed += 1;
                }
                LockLevel::Shared | LockLevel::Exclusive => {}
            }
        }

        if changed > 0 {
            info!(replica = %replica, changed, "locks demoted");
        }
        Ok(changed)
    }

    /// Deletes every row owned by the replica.
    pub(crate) fn relinquish_in(
        &self,
        txn: &mut StoreTxn<'_>,
        replica: ReplicaId,
    ) -> Result<usize, RegistryError> {
        let owned = |key: &[u8], _value: &[u8]| -> Result<bool, StorageError> {
            Ok(owner_of_key(key)? == replica)
        };
        let rows = txn.scan_in_set(LOCKS_TABLE, &owned)?;
        for row in &rows {
            txn.delete(LOCKS_TABLE, &row.key)?;
        }

        info!(replica = %replica, released = rows.len(), "locks relinquished");
        Ok(rows.len())
    }

    pub(crate) fn query_locks_in(
        &self,
        txn: &StoreTxn<'_>,
        replica: ReplicaId,
    ) -> Result<LockRequest, RegistryError> {
        let owned = |key: &[u8], _value: &[u8]| -> Result<bool, StorageError> {
            Ok(owner_of_key(key)? == replica)
        };

        let mut locks = LockRequest::new();
        for row in txn.scan_in_set(LOCKS_TABLE, &owned)? {
            let row = LockRow::decode(&row)?;
            let level = if row.exclusive {
                LockLevel::Exclusive
            } else {
                LockLevel::Shared
            };
            locks.insert(Lock::new(row.id, level));
        }
        Ok(locks)
    }

    pub(crate) fn query_lock_states_in(
        &self,
        txn: &StoreTxn<'_>,
        ids: &LockableIdSet,
    ) -> Result<Vec<LockInfo>, RegistryError> {
        ids.iter()
            .map(|id| aggregate(*id, &self.rows_for(txn, *id)?))
            .collect()
    }

    /// Acquires every lock in `request`, or none of them.
    #[instrument(skip(self, request), fields(locks = request.len()))]
    pub fn acquire_locks(
        &self,
        request: &LockRequest,
        replica: ReplicaId,
        options: ResponseOptions,
    ) -> Result<Response, RegistryError> {
        let mut txn = self.begin()?;
        let evaluation = self.evaluate_in(&txn, request, replica, options)?;

        if !evaluation.status.is_success() {
            txn.rollback();
            return Ok(Response {
                status: evaluation.status,
                lock_states: evaluation.denied,
                code_states: Vec::new(),
            });
        }

        self.apply_in(&mut txn, request, replica)?;
        txn.commit()?;
        Ok(Response::success())
    }

    /// Ownership of one resource.
    pub fn query_lock_state(&self, id: LockableId) -> Result<LockInfo, RegistryError> {
        let txn = self.begin()?;
        aggregate(id, &self.rows_for(&txn, id)?)
    }

    pub fn query_lock_states(&self, ids: &LockableIdSet) -> Result<Vec<LockInfo>, RegistryError> {
        let txn = self.begin()?;
        self.query_lock_states_in(&txn, ids)
    }

    /// All locks held by the replica.
    pub fn query_locks(&self, replica: ReplicaId) -> Result<LockRequest, RegistryError> {
        let txn = self.begin()?;
        self.query_locks_in(&txn, replica)
    }

    #[instrument(skip(self))]
    pub fn relinquish_locks(&self, replica: ReplicaId) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin()?;
        self.relinquish_in(&mut txn, replica)?;
        txn.commit()?;
        Ok(RepositoryStatus::Success)
    }

    #[instrument(skip(self, locks), fields(locks = locks.len()))]
    pub fn demote_locks(
        &self,
        locks: &LockRequest,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin()?;
        self.demote_in(&mut txn, locks, replica)?;
        txn.commit()?;
        Ok(RepositoryStatus::Success)
    }

    /// Inserts a raw ownership row, bypassing the conflict check.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, id: LockableId, owner: ReplicaId, exclusive: bool) {
        let mut txn = self.begin().unwrap();
        txn.put(LOCKS_TABLE, row_key(id, owner), encode_exclusive(exclusive))
            .unwrap();
        txn.commit().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ReplicaId = ReplicaId(1);
    const B: ReplicaId = ReplicaId(2);

    fn create_test_registry() -> LockRegistry {
        LockRegistry::new(Arc::new(RelationStore::in_memory())).unwrap()
    }

    fn request(locks: &[Lock]) -> LockRequest {
        locks.iter().copied().collect()
    }

    #[test]
    fn test_acquire_and_query() {
        let registry = create_test_registry();
        let obj = LockableId::object(10);

        let response = registry
            .acquire_locks(&request(&[Lock::exclusive(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        assert!(response.is_success());

        let info = registry.query_lock_state(obj).unwrap();
        assert_eq!(info.ownership, LockOwnership::Exclusive(A));
        assert!(info.tracked);
        assert_eq!(registry.query_locks(A).unwrap().level(&obj), LockLevel::Exclusive);
    }

    #[test]
    fn test_shared_locks_coexist() {
        let registry = create_test_registry();
        let container = LockableId::container(3);

        for replica in [A, B] {
            let response = registry
                .acquire_locks(&request(&[Lock::shared(container)]), replica, ResponseOptions::NONE)
                .unwrap();
            assert!(response.is_success());
        }

        let info = registry.query_lock_state(container).unwrap();
        assert_eq!(info.ownership.level_of(A), LockLevel::Shared);
        assert_eq!(info.ownership.level_of(B), LockLevel::Shared);
    }

    #[test]
    fn test_exclusive_conflicts_with_shared() {
        let registry = create_test_registry();
        let container = LockableId::container(3);
        registry
            .acquire_locks(&request(&[Lock::shared(container)]), A, ResponseOptions::NONE)
            .unwrap();

        let response = registry
            .acquire_locks(&request(&[Lock::exclusive(container)]), B, ResponseOptions::LOCK_STATE)
            .unwrap();
        assert_eq!(response.status, RepositoryStatus::LockAlreadyHeld);
        assert_eq!(response.lock_states.len(), 1);
        assert_eq!(response.lock_states[0].ownership.level_of(A), LockLevel::Shared);
    }

    #[test]
    fn test_denied_request_writes_nothing() {
        let registry = create_test_registry();
        let taken = LockableId::object(1);
        let free = LockableId::object(2);
        registry
            .acquire_locks(&request(&[Lock::exclusive(taken)]), A, ResponseOptions::NONE)
            .unwrap();

        let response = registry
            .acquire_locks(
                &request(&[Lock::exclusive(free), Lock::shared(taken)]),
                B,
                ResponseOptions::NONE,
            )
            .unwrap();
        assert_eq!(response.status, RepositoryStatus::LockAlreadyHeld);
        assert!(response.lock_states.is_empty());
        assert!(!registry.query_lock_state(free).unwrap().tracked);
    }

    #[test]
    fn test_evaluation_agrees_with_and_without_detail() {
        let registry = create_test_registry();
        registry
            .acquire_locks(&request(&[Lock::shared(LockableId::object(1))]), B, ResponseOptions::NONE)
            .unwrap();
        registry
            .acquire_locks(&request(&[Lock::exclusive(LockableId::object(2))]), A, ResponseOptions::NONE)
            .unwrap();

        let cases = [
            (request(&[Lock::shared(LockableId::object(1))]), RepositoryStatus::Success),
            (request(&[Lock::exclusive(LockableId::object(1))]), RepositoryStatus::LockAlreadyHeld),
            (request(&[Lock::exclusive(LockableId::object(2))]), RepositoryStatus::Success),
            (request(&[Lock::released(LockableId::object(1))]), RepositoryStatus::Success),
            (
                request(&[Lock::shared(LockableId::object(3)), Lock::exclusive(LockableId::object(1))]),
                RepositoryStatus::LockAlreadyHeld,
            ),
        ];

        let txn = registry.begin().unwrap();
        for (locks, expected) in &cases {
            let fast = registry.evaluate_in(&txn, locks, A, ResponseOptions::NONE).unwrap();
            let detailed = registry.evaluate_in(&txn, locks, A, ResponseOptions::LOCK_STATE).unwrap();
            assert_eq!(fast.status, *expected);
            assert_eq!(detailed.status, *expected);
            assert!(fast.denied.is_empty());
            assert_eq!(detailed.denied.len(), usize::from(*expected != RepositoryStatus::Success));
        }
    }

    #[test]
    fn test_upgrade_in_place() {
        let registry = create_test_registry();
        let obj = LockableId::object(5);
        registry
            .acquire_locks(&request(&[Lock::shared(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        registry
            .acquire_locks(&request(&[Lock::exclusive(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        assert_eq!(
            registry.query_lock_state(obj).unwrap().ownership,
            LockOwnership::Exclusive(A)
        );

        // Asking for less than what is held is a no-op.
        registry
            .acquire_locks(&request(&[Lock::shared(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        assert_eq!(
            registry.query_lock_state(obj).unwrap().ownership,
            LockOwnership::Exclusive(A)
        );
    }

    #[test]
    fn test_acquire_is_idempotent() {
        let registry = create_test_registry();
        let locks = request(&[Lock::shared(LockableId::STORE), Lock::exclusive(LockableId::object(4))]);
        registry.acquire_locks(&locks, A, ResponseOptions::NONE).unwrap();
        registry.acquire_locks(&locks, A, ResponseOptions::NONE).unwrap();
        assert_eq!(registry.query_locks(A).unwrap(), locks);
    }

    #[test]
    fn test_none_level_ignored_on_acquire() {
        let registry = create_test_registry();
        let obj = LockableId::object(8);
        let response = registry
            .acquire_locks(&request(&[Lock::released(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        assert!(response.is_success());
        assert!(registry.query_locks(A).unwrap().is_empty());
    }

    #[test]
    fn test_demote_to_shared_then_release() {
        let registry = create_test_registry();
        let obj = LockableId::object(9);
        registry
            .acquire_locks(&request(&[Lock::exclusive(obj)]), A, ResponseOptions::NONE)
            .unwrap();

        registry.demote_locks(&request(&[Lock::shared(obj)]), A).unwrap();
        assert_eq!(registry.query_locks(A).unwrap().level(&obj), LockLevel::Shared);

        // B can now share it.
        let response = registry
            .acquire_locks(&request(&[Lock::shared(obj)]), B, ResponseOptions::NONE)
            .unwrap();
        assert!(response.is_success());

        registry.demote_locks(&request(&[Lock::released(obj)]), A).unwrap();
        assert_eq!(registry.query_locks(A).unwrap().level(&obj), LockLevel::None);
    }

    #[test]
    fn test_demote_never_raises() {
        let registry = create_test_registry();
        let obj = LockableId::object(9);
        registry
            .acquire_locks(&request(&[Lock::shared(obj)]), A, ResponseOptions::NONE)
            .unwrap();
        registry.demote_locks(&request(&[Lock::exclusive(obj)]), A).unwrap();
        assert_eq!(registry.query_locks(A).unwrap().level(&obj), LockLevel::Shared);

        let other = LockableId::object(10);
        registry.demote_locks(&request(&[Lock::shared(other)]), A).unwrap();
        assert!(!registry.query_locks(A).unwrap().contains(&other));
    }

    #[test]
    fn test_relinquish_only_own_rows() {
        let registry = create_test_registry();
        let shared = LockableId::container(1);
        registry
            .acquire_locks(
                &request(&[Lock::shared(shared), Lock::exclusive(LockableId::object(2))]),
                A,
                ResponseOptions::NONE,
            )
            .unwrap();
        registry
            .acquire_locks(&request(&[Lock::shared(shared)]), B, ResponseOptions::NONE)
            .unwrap();

        registry.relinquish_locks(A).unwrap();
        assert!(registry.query_locks(A).unwrap().is_empty());
        assert_eq!(registry.query_locks(B).unwrap().level(&shared), LockLevel::Shared);
    }

    #[test]
    fn test_query_lock_states_batch() {
        let registry = create_test_registry();
        let held = LockableId::object(1);
        let free = LockableId::object(2);
        registry
            .acquire_locks(&request(&[Lock::exclusive(held)]), A, ResponseOptions::NONE)
            .unwrap();

        let ids: LockableIdSet = [held, free].into_iter().collect();
        let states = registry.query_lock_states(&ids).unwrap();
        assert_eq!(states.len(), 2);
        assert!(states[0].tracked);
        assert!(!states[1].tracked);
    }

    #[test]
    fn test_corrupt_ownership_is_sync_error() {
        let registry = create_test_registry();
        let obj = LockableId::object(77);
        registry.insert_raw(obj, A, true);
        registry.insert_raw(obj, B, false);

        let err = registry.query_lock_state(obj).unwrap_err();
        assert!(matches!(err, RegistryError::Sync(_)));
        assert_eq!(err.status(), RepositoryStatus::SyncError);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Acquire { replica: u32, object: u64, exclusive: bool },
        Demote { replica: u32, object: u64, release: bool },
        Relinquish { replica: u32 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u32..4, 0u64..6, any::<bool>())
                .prop_map(|(replica, object, exclusive)| Op::Acquire { replica, object, exclusive }),
            2 => (0u32..4, 0u64..6, any::<bool>())
                .prop_map(|(replica, object, release)| Op::Demote { replica, object, release }),
            1 => (0u32..4).prop_map(|replica| Op::Relinquish { replica }),
        ]
    }

    proptest! {
        #[test]
        fn ownership_never_mixes_exclusive_with_others(
            ops in prop::collection::vec(op_strategy(), 1..60),
        ) {
            let registry = LockRegistry::new(Arc::new(RelationStore::in_memory())).unwrap();

            for op in ops {
                match op {
                    Op::Acquire { replica, object, exclusive } => {
                        let lock = if exclusive {
                            Lock::exclusive(LockableId::object(object))
                        } else {
                            Lock::shared(LockableId::object(object))
                        };
                        let locks: LockRequest = std::iter::once(lock).collect();
                        registry.acquire_locks(&locks, ReplicaId(replica), ResponseOptions::NONE).unwrap();
                    }
                    Op::Demote { replica, object, release } => {
                        let level = if release { LockLevel::None } else { LockLevel::Shared };
                        let locks: LockRequest =
                            std::iter::once(Lock::new(LockableId::object(object), level)).collect();
                        registry.demote_locks(&locks, ReplicaId(replica)).unwrap();
                    }
                    Op::Relinquish { replica } => {
                        registry.relinquish_locks(ReplicaId(replica)).unwrap();
                    }
                }

                // Aggregation fails with a sync error if the invariant breaks.
                for object in 0u64..6 {
                    let info = registry.query_lock_state(LockableId::object(object));
                    prop_assert!(info.is_ok());
                }
            }
        }

        #[test]
        fn conflicting_requests_are_denied(
            first_exclusive in any::<bool>(),
            second_exclusive in any::<bool>(),
        ) {
            let registry = LockRegistry::new(Arc::new(RelationStore::in_memory())).unwrap();
            let obj = LockableId::object(1);
            let level = |exclusive| if exclusive { LockLevel::Exclusive } else { LockLevel::Shared };

            let first: LockRequest = std::iter::once(Lock::new(obj, level(first_exclusive))).collect();
            let second: LockRequest = std::iter::once(Lock::new(obj, level(second_exclusive))).collect();
            registry.acquire_locks(&first, ReplicaId(1), ResponseOptions::NONE).unwrap();
            let response = registry.acquire_locks(&second, ReplicaId(2), ResponseOptions::NONE).unwrap();

            let expect_conflict = first_exclusive || second_exclusive;
            prop_assert_eq!(response.status == RepositoryStatus::LockAlreadyHeld, expect_conflict);
        }
    }
}
