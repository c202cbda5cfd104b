// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Code registry: reservation and usage of codes.
//!
//! One row per code that is not `Available`:
//!
//! ```text
//! key:   [spec:u64 BE][scope:str][folded value:str]
//! value: [state:u8][revision:opt str][replica:opt u32][value:str]
//! ```
//!
//! The key holds the value with ASCII letters lowered, so spellings that
//! differ only in case share one row. The row keeps the spelling it was
//! last written with. A missing row means the code is available. A `Reserved` row may carry
//! the revision that last discarded the code, so releasing it again
//! restores `Discarded(revision)` rather than dropping that history.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::repository::{RegistryError, RepositoryStatus, Response, ResponseOptions};
use crate::resource::{Code, CodeInfo, CodeSet, CodeSpecId, CodeState, ReplicaId, RevisionId};
use crate::storage::{RelationStore, RowKeyReader, RowKeyWriter, StorageError, StoreTxn, Table};

/// Table holding code state rows.
pub const CODES_TABLE: Table = Table::new(2, "codes");

const STATE_AVAILABLE: u8 = 0;
const STATE_RESERVED: u8 = 1;
const STATE_DISCARDED: u8 = 2;
const STATE_USED: u8 = 3;

fn code_key(code: &Code) -> Vec<u8> {
    RowKeyWriter::new()
        .u64(code.spec().0)
        .str(code.scope())
        .str(&code.folded_value())
        .finish()
}

/// Rebuilds a code from its key and the spelling stored in its row.
fn decode_code(key: &[u8], spelling: String) -> Result<Code, StorageError> {
    let mut reader = RowKeyReader::new(key);
    let spec = CodeSpecId(reader.u64()?);
    let scope = reader.str()?;
    let _folded = reader.str()?;
    reader.finish()?;
    Ok(Code::new(spec, scope, spelling))
}

/// Raw columns of a code row.
struct RawCodeValue {
    state: u8,
    revision: Option<String>,
    replica: Option<u32>,
    spelling: String,
}

impl RawCodeValue {
    fn decode(value: &[u8]) -> Result<Self, StorageError> {
        let mut reader = RowKeyReader::new(value);
        let state = reader.u8()?;
        let revision = reader.opt_str()?;
        let replica = reader.opt_u32()?;
        let spelling = reader.str()?;
        reader.finish()?;
        Ok(Self {
            state,
            revision,
            replica,
            spelling,
        })
    }
}

/// A decoded code row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeRow {
    state: CodeState,
    /// Discard revision carried by a reserved code.
    retained: Option<RevisionId>,
    /// Value as spelled by the last writer.
    spelling: String,
}

impl CodeRow {
    fn decode(code: &Code, value: &[u8]) -> Result<Self, RegistryError> {
        let raw = RawCodeValue::decode(value)?;
        let revision = raw.revision.map(RevisionId::from);
        let spelling = raw.spelling;

        let row = match (raw.state, revision, raw.replica) {
            (STATE_RESERVED, retained, Some(replica)) => CodeRow {
                state: CodeState::Reserved(ReplicaId(replica)),
                retained,
                spelling,
            },
            (STATE_DISCARDED, Some(rev), _) => CodeRow {
                state: CodeState::Discarded(rev),
                retained: None,
                spelling,
            },
            (STATE_USED, Some(rev), _) => CodeRow {
                state: CodeState::Used(rev),
                retained: None,
                spelling,
            },
            (state, _, _) => {
                let reason = if state == STATE_AVAILABLE {
                    "available code has a stored row".to_string()
                } else {
                    format!("unreadable code state {}", state)
                };
                error!(code = %code, reason = %reason, "code registry out of sync");
                return Err(RegistryError::Sync(format!("{}: {}", code, reason)));
            }
        };
        Ok(row)
    }

    /// The code as stored, keeping the caller's spec and scope.
    fn stored_code(&self, code: &Code) -> Code {
        Code::new(code.spec(), code.scope(), self.spelling.clone())
    }

    fn encode(code: &Code, state: &CodeState, retained: Option<&RevisionId>) -> Vec<u8> {
        let writer = RowKeyWriter::new();
        let writer = match state {
            CodeState::Reserved(replica) => writer
                .u8(STATE_RESERVED)
                .opt_str(retained.map(RevisionId::as_str))
                .opt_u32(Some(replica.0)),
            CodeState::Discarded(rev) => writer
                .u8(STATE_DISCARDED)
                .opt_str(Some(rev.as_str()))
                .opt_u32(None),
            CodeState::Used(rev) => writer
                .u8(STATE_USED)
                .opt_str(Some(rev.as_str()))
                .opt_u32(None),
            CodeState::Available => writer.u8(STATE_AVAILABLE).opt_str(None).opt_u32(None),
        };
        writer.str(code.value()).finish()
    }
}

/// Result of checking a reservation against the registry.
#[derive(Debug)]
pub(crate) struct CodeEvaluation {
    pub status: RepositoryStatus,
    /// State of each unavailable code, if requested.
    pub denied: Vec<CodeInfo>,
    /// Discard revisions to carry into the new reservations.
    pub retained: BTreeMap<Code, RevisionId>,
}

/// Server-side registry of code states.
pub struct CodeRegistry {
    store: Arc<RelationStore>,
}

impl CodeRegistry {
    /// Creates the registry, creating its table on first use.
    pub fn new(store: Arc<RelationStore>) -> Result<Self, StorageError> {
        store.create_table(CODES_TABLE)?;
        Ok(Self { store })
    }

    pub(crate) fn begin(&self) -> Result<StoreTxn<'_>, StorageError> {
        self.store.begin(&[CODES_TABLE])
    }

    fn row_in(&self, txn: &StoreTxn<'_>, code: &Code) -> Result<Option<CodeRow>, RegistryError> {
        match txn.get(CODES_TABLE, &code_key(code))? {
            Some(value) => CodeRow::decode(code, &value).map(Some),
            None => Ok(None),
        }
    }

    fn info_in(&self, txn: &StoreTxn<'_>, code: &Code) -> Result<CodeInfo, RegistryError> {
        Ok(match self.row_in(txn, code)? {
            Some(row) => CodeInfo::new(row.stored_code(code), row.state),
            None => CodeInfo::available(code.clone()),
        })
    }

    pub(crate) fn evaluate_reserve_in(
        &self,
        txn: &StoreTxn<'_>,
        codes: &CodeSet,
        replica: ReplicaId,
        options: ResponseOptions,
    ) -> Result<CodeEvaluation, RegistryError> {
        let mut evaluation = CodeEvaluation {
            status: RepositoryStatus::Success,
            denied: Vec::new(),
            retained: BTreeMap::new(),
        };

        for code in codes {
            let Some(row) = self.row_in(txn, code)? else {
                continue;
            };

            let available = match &row.state {
                CodeState::Reserved(owner) => *owner == replica,
                CodeState::Used(_) => false,
                CodeState::Discarded(_) | CodeState::Available => true,
            };

            if !available {
                warn!(code = %code, state = ?row.state, "code unavailable");
                evaluation.status = RepositoryStatus::CodeUnavailable;
                if options.contains(ResponseOptions::CODE_STATE) {
                    evaluation.denied.push(CodeInfo::new(row.stored_code(code), row.state));
                }
                continue;
            }

            let retained = match row.state {
                CodeState::Discarded(rev) => Some(rev),
                _ => row.retained,
            };
            if let Some(rev) = retained {
                evaluation.retained.insert(code.clone(), rev);
            }
        }

        Ok(evaluation)
    }

    pub(crate) fn apply_reserve_in(
        &self,
        txn: &mut StoreTxn<'_>,
        codes: &CodeSet,
        replica: ReplicaId,
        retained: &BTreeMap<Code, RevisionId>,
    ) -> Result<(), RegistryError> {
        let state = CodeState::Reserved(replica);
        for code in codes {
            let value = CodeRow::encode(code, &state, retained.get(code));
            txn.put(CODES_TABLE, code_key(code), value)?;
            debug!(code = %code, "code reserved");
        }
        if !codes.is_empty() {
            info!(replica = %replica, reserved = codes.len(), "codes reserved");
        }
        Ok(())
    }

    /// Releases codes reserved by the replica, or none of them.
    pub(crate) fn release_in(
        &self,
        txn: &mut StoreTxn<'_>,
        codes: &CodeSet,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let mut rows = Vec::with_capacity(codes.len());
        for code in codes {
            match self.row_in(txn, code)? {
                Some(row) if row.state == CodeState::Reserved(replica) => rows.push((code, row)),
                other => {
                    warn!(code = %code, state = ?other.map(|r| r.state), "release of unreserved code");
                    return Ok(RepositoryStatus::CodeNotReserved);
                }
            }
        }

        for (code, row) in rows {
            let key = code_key(code);
            match row.retained {
                Some(ref rev) => {
                    let restored = CodeRow::encode(&row.stored_code(code), &CodeState::Discarded(rev.clone()), None);
                    txn.put(CODES_TABLE, key, restored)?;
                    debug!(code = %code, "code returned to discarded");
                }
                None => {
                    txn.delete(CODES_TABLE, &key)?;
                    debug!(code = %code, "code released");
                }
            }
        }

        if !codes.is_empty() {
            info!(replica = %replica, released = codes.len(), "codes released");
        }
        Ok(RepositoryStatus::Success)
    }

    pub(crate) fn relinquish_in(
        &self,
        txn: &mut StoreTxn<'_>,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let codes = self.query_codes_in(txn, replica)?;
        self.release_in(txn, &codes, replica)
    }

    /// Upserts each code to `state`.
    pub(crate) fn mark_in(
        &self,
        txn: &mut StoreTxn<'_>,
        codes: &CodeSet,
        state: &CodeState,
    ) -> Result<(), RegistryError> {
        for code in codes {
            txn.put(CODES_TABLE, code_key(code), CodeRow::encode(code, state, None))?;
            debug!(code = %code, state = ?state, "code marked");
        }
        Ok(())
    }

    pub(crate) fn query_codes_in(
        &self,
        txn: &StoreTxn<'_>,
        replica: ReplicaId,
    ) -> Result<CodeSet, RegistryError> {
        let reserved = |_key: &[u8], value: &[u8]| -> Result<bool, StorageError> {
            let raw = RawCodeValue::decode(value)?;
            Ok(raw.state == STATE_RESERVED && raw.replica == Some(replica.0))
        };

        txn.scan_in_set(CODES_TABLE, &reserved)?
            .into_iter()
            .map(|row| -> Result<Code, RegistryError> {
                let raw = RawCodeValue::decode(&row.value)?;
                Ok(decode_code(&row.key, raw.spelling)?)
            })
            .collect()
    }

    pub(crate) fn query_code_states_in(
        &self,
        txn: &StoreTxn<'_>,
        codes: &CodeSet,
    ) -> Result<Vec<CodeInfo>, RegistryError> {
        codes.iter().map(|code| self.info_in(txn, code)).collect()
    }

    /// Reserves every code in `codes`, or none of them.
    ///
    /// With `query_only` the reservation is evaluated but not written.
    #[instrument(skip(self, codes), fields(codes = codes.len()))]
    pub fn reserve_codes(
        &self,
        codes: &CodeSet,
        replica: ReplicaId,
        options: ResponseOptions,
        query_only: bool,
    ) -> Result<Response, RegistryError> {
        let mut txn = self.begin()?;
        let evaluation = self.evaluate_reserve_in(&txn, codes, replica, options)?;
        let response = Response {
            status: evaluation.status,
            lock_states: Vec::new(),
            code_states: evaluation.denied,
        };

        if !response.is_success() || query_only {
            txn.rollback();
            return Ok(response);
        }

        self.apply_reserve_in(&mut txn, codes, replica, &evaluation.retained)?;
        txn.commit()?;
        Ok(response)
    }

    #[instrument(skip(self, codes), fields(codes = codes.len()))]
    pub fn release_codes(
        &self,
        codes: &CodeSet,
        replica: ReplicaId,
    ) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin()?;
        let status = self.release_in(&mut txn, codes, replica)?;
        if status.is_success() {
            txn.commit()?;
        } else {
            txn.rollback();
        }
        Ok(status)
    }

    #[instrument(skip(self))]
    pub fn relinquish_codes(&self, replica: ReplicaId) -> Result<RepositoryStatus, RegistryError> {
        let mut txn = self.begin()?;
        let status = self.relinquish_in(&mut txn, replica)?;
        txn.commit()?;
        Ok(status)
    }

    pub fn query_code_state(&self, code: &Code) -> Result<CodeInfo, RegistryError> {
        let txn = self.begin()?;
        self.info_in(&txn, code)
    }

    pub fn query_code_states(&self, codes: &CodeSet) -> Result<Vec<CodeInfo>, RegistryError> {
        let txn = self.begin()?;
        self.query_code_states_in(&txn, codes)
    }

    /// Codes currently reserved by the replica.
    pub fn query_codes(&self, replica: ReplicaId) -> Result<CodeSet, RegistryError> {
        let txn = self.begin()?;
        self.query_codes_in(&txn, replica)
    }

    /// Stores a raw state byte for a code, bypassing validation.
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, code: &Code, state: u8) {
        let mut txn = self.begin().unwrap();
        let value = RowKeyWriter::new()
            .u8(state)
            .opt_str(None)
            .opt_u32(None)
            .str(code.value())
            .finish();
        txn.put(CODES_TABLE, code_key(code), value).unwrap();
        txn.commit().unwrap();
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reserved_code_has_single_holder(
            attempts in prop::collection::vec((0u32..4, 0u8..8, any::<bool>()), 1..40),
        ) {
            let registry = CodeRegistry::new(Arc::new(RelationStore::in_memory())).unwrap();
            let mut holders: BTreeMap<u8, u32> = BTreeMap::new();

            for (replica, value, upper) in attempts {
                let spelling = if upper { format!("TAG-{}", value) } else { format!("tag-{}", value) };
                let codes: CodeSet = std::iter::once(Code::new(CodeSpecId(1), "s", spelling)).collect();
                let response = registry
                    .reserve_codes(&codes, ReplicaId(replica), ResponseOptions::NONE, false)
                    .unwrap();

                match holders.get(&value).copied() {
                    Some(holder) if holder != replica => {
                        prop_assert_eq!(response.status, RepositoryStatus::CodeUnavailable);
                    }
                    _ => {
                        prop_assert!(response.is_success());
                        holders.insert(value, replica);
                    }
                }
            }

            for (value, holder) in holders {
                let info = registry
                    .query_code_state(&Code::new(CodeSpecId(1), "s", format!("Tag-{}", value)))
                    .unwrap();
                prop_assert_eq!(info.state, CodeState::Reserved(ReplicaId(holder)));
            }
        }
    }
}
