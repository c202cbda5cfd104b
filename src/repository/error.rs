// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Registry error types.

use crate::storage::StorageError;

use super::RepositoryStatus;

/// Errors that abort a registry call.
///
/// Ordinary denials such as a held lock are not errors; they come back as
/// a [`RepositoryStatus`] in a successful result.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("registry out of sync: {0}")]
    Sync(String),

    #[error("repository authority unavailable")]
    ServerUnavailable,
}

impl RegistryError {
    /// The status a caller reports for this error.
    pub fn status(&self) -> RepositoryStatus {
        match self {
            RegistryError::Storage(_) | RegistryError::Sync(_) => RepositoryStatus::SyncError,
            RegistryError::ServerUnavailable => RepositoryStatus::ServerUnavailable,
        }
    }
}
