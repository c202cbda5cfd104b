// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Applies the code effects of a pushed revision.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::repository::RegistryError;
use crate::resource::{CodeSet, CodeState, RevisionId};

use super::CodeRegistry;

/// Moves codes to `Used` or `Discarded` when a revision is committed.
///
/// This is the only way a code becomes `Used`.
pub struct RevisionSynchronizer {
    codes: Arc<CodeRegistry>,
}

impl RevisionSynchronizer {
    pub fn new(codes: Arc<CodeRegistry>) -> Self {
        Self { codes }
    }

    /// Records, in one transaction, the codes `revision` assigned and discarded.
    ///
    /// A code present in both sets ends up `Discarded`.
    #[instrument(skip(self, assigned, discarded), fields(assigned = assigned.len(), discarded = discarded.len()))]
    pub fn on_revision_committed(
        &self,
        assigned: &CodeSet,
        discarded: &CodeSet,
        revision: &RevisionId,
    ) -> Result<(), RegistryError> {
        let mut txn = self.codes.begin()?;
        self.codes
            .mark_in(&mut txn, assigned, &CodeState::Used(revision.clone()))?;
        self.codes
            .mark_in(&mut txn, discarded, &CodeState::Discarded(revision.clone()))?;
        txn.commit()?;

        info!(
            revision = %revision,
            used = assigned.len(),
            discarded = discarded.len(),
            "revision codes recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepositoryStatus, ResponseOptions};
    use crate::resource::{Code, CodeSpecId, ReplicaId};
    use crate::storage::RelationStore;

    fn setup() -> (Arc<CodeRegistry>, RevisionSynchronizer) {
        let codes = Arc::new(CodeRegistry::new(Arc::new(RelationStore::in_memory())).unwrap());
        let sync = RevisionSynchronizer::new(Arc::clone(&codes));
        (codes, sync)
    }

    fn set(values: &[&str]) -> CodeSet {
        values
            .iter()
            .map(|v| Code::new(CodeSpecId(1), "scope", *v))
            .collect()
    }

    #[test]
    fn test_reserved_codes_become_used() {
        let (codes, sync) = setup();
        let reserved = set(&["a", "b"]);
        codes
            .reserve_codes(&reserved, ReplicaId(1), ResponseOptions::NONE, false)
            .unwrap();

        let rev = RevisionId::from("rev-1");
        sync.on_revision_committed(&reserved, &CodeSet::new(), &rev).unwrap();

        for info in codes.query_code_states(&reserved).unwrap() {
            assert_eq!(info.state, CodeState::Used(rev.clone()));
        }
        // Used codes are no longer held by the replica.
        assert!(codes.query_codes(ReplicaId(1)).unwrap().is_empty());

        let response = codes
            .reserve_codes(&set(&["a"]), ReplicaId(2), ResponseOptions::NONE, false)
            .unwrap();
        assert_eq!(response.status, RepositoryStatus::CodeUnavailable);
    }

    #[test]
    fn test_discarded_codes_reusable() {
        let (codes, sync) = setup();
        let used = set(&["old"]);
        sync.on_revision_committed(&used, &CodeSet::new(), &RevisionId::from("r1"))
            .unwrap();
        sync.on_revision_committed(&CodeSet::new(), &used, &RevisionId::from("r2"))
            .unwrap();

        assert_eq!(
            codes.query_code_states(&used).unwrap()[0].state,
            CodeState::Discarded(RevisionId::from("r2"))
        );
        let response = codes
            .reserve_codes(&used, ReplicaId(3), ResponseOptions::NONE, false)
            .unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_code_in_both_sets_is_discarded() {
        let (codes, sync) = setup();
        let both = set(&["x"]);
        let rev = RevisionId::from("r5");
        sync.on_revision_committed(&both, &both, &rev).unwrap();
        assert_eq!(
            codes.query_code_states(&both).unwrap()[0].state,
            CodeState::Discarded(rev)
        );
    }
}
