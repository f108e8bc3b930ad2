// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Plan Value Object
//!
//! The output of the Chunk Planner (C1): an ordered, contiguous,
//! non-overlapping sequence of byte ranges over the input blob.

use crate::value_objects::ChunkSize;
use crate::UploadError;
use serde::{Deserialize, Serialize};

/// A single contiguous, half-open byte range `[start, end)` addressed by
/// a dense, zero-based `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRange {
    pub index: u32,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// The immutable, per-upload plan produced by the Chunk Planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPlan {
    ranges: Vec<ChunkRange>,
}

impl ChunkPlan {
    /// Builds a plan over `file_size` bytes using `chunk_size`-sized
    /// chunks. `file_size == 0` produces an empty plan.
    pub fn new(file_size: u64, chunk_size: ChunkSize) -> Result<Self, UploadError> {
        if file_size == 0 {
            return Ok(Self { ranges: Vec::new() });
        }

        let count = chunk_size.chunks_needed_for_file(file_size);
        let mut ranges = Vec::with_capacity(count as usize);
        for index in 0..count {
            let start = index * chunk_size.bytes();
            let end = (start + chunk_size.bytes()).min(file_size);
            ranges.push(ChunkRange {
                index: index as u32,
                start,
                end,
            });
        }
        Ok(Self { ranges })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[ChunkRange] {
        &self.ranges
    }

    pub fn range_at(&self, index: u32) -> Option<&ChunkRange> {
        self.ranges.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_file_produces_empty_plan() {
        let plan = ChunkPlan::new(0, ChunkSize::new(100).unwrap()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn exact_multiple_produces_even_ranges() {
        let plan = ChunkPlan::new(200, ChunkSize::new(100).unwrap()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.range_at(0).unwrap().start, 0);
        assert_eq!(plan.range_at(0).unwrap().end, 100);
        assert_eq!(plan.range_at(1).unwrap().start, 100);
        assert_eq!(plan.range_at(1).unwrap().end, 200);
    }

    #[test]
    fn non_multiple_has_short_last_range() {
        let plan = ChunkPlan::new(250, ChunkSize::new(100).unwrap()).unwrap();
        assert_eq!(plan.len(), 3);
        let last = plan.range_at(2).unwrap();
        assert_eq!(last.start, 200);
        assert_eq!(last.end, 250);
        assert_eq!(last.size(), 50);
    }

    proptest! {
        #[test]
        fn planner_is_total_and_contiguous(file_size in 0u64..5_000_000, chunk_size in 1u64..1_000_000) {
            let plan = ChunkPlan::new(file_size, ChunkSize::new(chunk_size).unwrap()).unwrap();

            let expected_count = if file_size == 0 { 0 } else { file_size.div_ceil(chunk_size) };
            prop_assert_eq!(plan.len() as u64, expected_count);

            let mut covered = 0u64;
            for (i, range) in plan.ranges().iter().enumerate() {
                prop_assert_eq!(range.index as usize, i);
                prop_assert_eq!(range.start, covered);
                prop_assert!(range.end > range.start);
                covered = range.end;
            }
            prop_assert_eq!(covered, file_size);
        }
    }
}
