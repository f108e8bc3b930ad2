// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Size Value Object
//!
//! A type-safe, validated byte count used to partition an upload into
//! chunks. A `ChunkSize` is always strictly positive: `chunkSize == 0`
//! is rejected at construction with `UploadError::InvalidArgument`,
//! matching the Chunk Planner's contract.

use crate::UploadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, strictly positive chunk size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkSize(u64);

impl ChunkSize {
    pub const DEFAULT: u64 = 1024 * 1024; // 1MB

    /// Creates a chunk size from a byte count, rejecting zero.
    pub fn new(bytes: u64) -> Result<Self, UploadError> {
        if bytes == 0 {
            return Err(UploadError::invalid_argument("chunkSize must be greater than 0"));
        }
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// Number of chunks needed to cover `file_size` bytes at this chunk
    /// size: `ceil(file_size / chunkSize)`.
    pub fn chunks_needed_for_file(&self, file_size: u64) -> u64 {
        if file_size == 0 {
            return 0;
        }
        file_size.div_ceil(self.0)
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(ChunkSize::new(0).is_err());
    }

    #[test]
    fn chunks_needed_rounds_up() {
        let cs = ChunkSize::new(100).unwrap();
        assert_eq!(cs.chunks_needed_for_file(0), 0);
        assert_eq!(cs.chunks_needed_for_file(10), 1);
        assert_eq!(cs.chunks_needed_for_file(200), 2);
        assert_eq!(cs.chunks_needed_for_file(250), 3);
    }

    #[test]
    fn default_is_one_megabyte() {
        assert_eq!(ChunkSize::default().bytes(), 1024 * 1024);
    }
}
