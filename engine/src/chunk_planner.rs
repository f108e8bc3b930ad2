// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Planner (C1)
//!
//! Produces the ordered byte-range plan a single upload is built
//! around.

use upload_engine_domain::{ChunkPlan, ChunkSize, UploadError};

/// The Chunk Planner component.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkPlanner;

impl ChunkPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Builds the plan for a file of `file_size` bytes, partitioned
    /// into `chunk_size`-sized ranges.
    pub fn plan(&self, file_size: u64, chunk_size: ChunkSize) -> Result<ChunkPlan, UploadError> {
        ChunkPlan::new(file_size, chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_for_small_file() {
        let plan = ChunkPlanner::new().plan(10, ChunkSize::new(100).unwrap()).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn empty_file_has_no_chunks() {
        let plan = ChunkPlanner::new().plan(0, ChunkSize::new(100).unwrap()).unwrap();
        assert!(plan.is_empty());
    }
}
