// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the relation store and the briefcase coordinator.

use std::path::{Path, PathBuf};

use crate::repository::ResponseOptions;
use crate::storage::DurabilityMode;

/// Where and how the authority keeps its registry tables.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// RocksDB directory (None = in-memory store).
    pub path: Option<PathBuf>,
    /// Durability of committed transactions on a persistent store.
    pub durability: DurabilityMode,
}

impl StoreConfig {
    /// A volatile store, lost when the process exits.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A persistent store rooted at `path`.
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            durability: DurabilityMode::default(),
        }
    }

    /// Sets the durability mode.
    pub fn with_durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    /// Returns true if no path is configured.
    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}

/// Behaviour of a briefcase's [`Coordinator`](crate::briefcase::Coordinator).
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Detail requested from the authority when a request is denied.
    pub response_options: ResponseOptions,
    /// Add the Shared container and store locks an object or container
    /// lock depends on before forwarding a request.
    pub expand_parent_locks: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            response_options: ResponseOptions::ALL,
            expand_parent_locks: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_response_options(mut self, options: ResponseOptions) -> Self {
        self.response_options = options;
        self
    }

    pub fn with_parent_lock_expansion(mut self, enabled: bool) -> Self {
        self.expand_parent_locks = enabled;
        self
    }
}
