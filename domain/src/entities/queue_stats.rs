// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Queue Stats Entity
//!
//! A live, read-only view over the Upload Queue's bookkeeping.
//! `QueueStats` has identity tied to one upload session rather than
//! value semantics — it is mutated in place as the queue progresses,
//! so it lives under `entities` rather than `value_objects`.

use serde::{Deserialize, Serialize};

/// Live counters for one Upload Queue.
///
/// Invariant, enforced by the Upload Queue's scheduler rather than
/// this struct: `pending + in_flight + completed + failed ==
/// total_chunks` at all times, and `completed <= total_chunks`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_chunks: u64,
    pub pending: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub all_chunks_hashed: bool,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the bookkeeping is internally consistent.
    pub fn is_consistent(&self) -> bool {
        self.pending + self.in_flight + self.completed + self.failed == self.total_chunks
            && self.completed <= self.total_chunks
    }

    /// Whether the drain condition currently holds.
    pub fn is_drained(&self) -> bool {
        self.all_chunks_hashed
            && self.pending == 0
            && self.in_flight == 0
            && self.failed == 0
            && self.completed == self.total_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_are_consistent_and_not_drained() {
        let stats = QueueStats::new();
        assert!(stats.is_consistent());
        assert!(!stats.is_drained());
    }

    #[test]
    fn drained_requires_all_chunks_hashed_and_zero_outstanding() {
        let mut stats = QueueStats {
            total_chunks: 3,
            completed: 3,
            all_chunks_hashed: true,
            ..Default::default()
        };
        assert!(stats.is_drained());

        stats.all_chunks_hashed = false;
        assert!(!stats.is_drained());
    }
}
