// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Row encoding for relation tables.
//!
//! Every stored key is `[table:u16 BE][column]*`. Integer columns are
//! fixed-width big-endian, text columns are `[len:u32 BE][utf-8 bytes]`,
//! and optional columns carry a one byte presence tag.
//!
//! Big-endian integers keep rows of one table ordered by their leading
//! columns under RocksDB's default byte-order comparator, so all rows
//! sharing a column prefix can be found with a single prefix scan.

use super::StorageError;

/// Builds an encoded row key or row value column by column.
#[derive(Debug, Default, Clone)]
pub struct RowKeyWriter {
    buf: Vec<u8>,
}

impl RowKeyWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single byte column.
    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    /// Appends a big-endian `u32` column.
    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends a big-endian `u64` column.
    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends a length-prefixed text column.
    pub fn str(mut self, value: &str) -> Self {
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Appends an optional text column.
    pub fn opt_str(self, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.u8(1).str(v),
            None => self.u8(0),
        }
    }

    /// Appends an optional `u32` column.
    pub fn opt_u32(self, value: Option<u32>) -> Self {
        match value {
            Some(v) => self.u8(1).u32(v),
            None => self.u8(0),
        }
    }

    /// Returns the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads columns back out of an encoded row key or value.
#[derive(Debug)]
pub struct RowKeyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RowKeyReader<'a> {
    /// Creates a reader positioned at the first column.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StorageError> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let bytes = &self.buf[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(StorageError::InvalidKeyEncoding(format!(
                "need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.buf.len()
            ))),
        }
    }

    /// Reads a single byte column.
    pub fn u8(&mut self) -> Result<u8, StorageError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian `u32` column.
    pub fn u32(&mut self) -> Result<u32, StorageError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a big-endian `u64` column.
    pub fn u64(&mut self) -> Result<u64, StorageError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads a length-prefixed text column.
    pub fn str(&mut self) -> Result<String, StorageError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StorageError::InvalidKeyEncoding(format!("text column: {}", e)))
    }

    /// Reads an optional text column.
    pub fn opt_str(&mut self) -> Result<Option<String>, StorageError> {
        match self.u8()? {
            0 => Ok(None),
            1 => self.str().map(Some),
            tag => Err(StorageError::InvalidKeyEncoding(format!(
                "bad presence tag {}",
                tag
            ))),
        }
    }

    /// Reads an optional `u32` column.
    pub fn opt_u32(&mut self) -> Result<Option<u32>, StorageError> {
        match self.u8()? {
            0 => Ok(None),
            1 => self.u32().map(Some),
            tag => Err(StorageError::InvalidKeyEncoding(format!(
                "bad presence tag {}",
                tag
            ))),
        }
    }

    /// Fails if any bytes remain unread.
    pub fn finish(self) -> Result<(), StorageError> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(StorageError::InvalidKeyEncoding(format!(
                "{} trailing bytes",
                self.buf.len() - self.pos
            )))
        }
    }
}

/// Returns the prefix shared by every stored key of a table.
#[inline]
pub fn table_prefix(table_id: u16) -> [u8; 2] {
    table_id.to_be_bytes()
}

/// Prepends the table prefix to a row key.
#[inline]
pub fn encode_table_key(table_id: u16, row_key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(2 + row_key.len());
    encoded.extend_from_slice(&table_prefix(table_id));
    encoded.extend_from_slice(row_key);
    encoded
}

/// Splits a stored key into its table id and row key.
pub fn decode_table_key(encoded: &[u8]) -> Result<(u16, &[u8]), StorageError> {
    if encoded.len() < 2 {
        return Err(StorageError::InvalidKeyEncoding(
            "key too short for table prefix".to_string(),
        ));
    }
    Ok((u16::from_be_bytes([encoded[0], encoded[1]]), &encoded[2..]))
}
