// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Storage error types.

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("table {0} has not been created")]
    UnknownTable(&'static str),

    #[error("table id {id} is already registered as {existing}")]
    TableConflict { id: u16, existing: String },

    #[error("table {0} is reserved")]
    ReservedTable(u16),

    #[error("table {0} was not declared when the transaction began")]
    TableNotInTransaction(&'static str),

    #[error("storage corruption: {0}")]
    Corruption(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("invalid row encoding: {0}")]
    InvalidKeyEncoding(String),
}
