// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Count Value Object
//!
//! The fixed size of the hash Worker Pool (C3) for one upload. Fixed for
//! the lifetime of the upload — no adaptive resizing (explicit Non-goal).

use crate::UploadError;
use serde::{Deserialize, Serialize};

/// A validated worker count, `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCount(usize);

impl WorkerCount {
    pub fn new(count: usize) -> Result<Self, UploadError> {
        if count == 0 {
            return Err(UploadError::invalid_argument("workerCount must be at least 1"));
        }
        Ok(Self(count))
    }

    /// `max(1, min(8, hardware_parallelism))`.
    pub fn recommended() -> Self {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self(cores.clamp(1, 8))
    }

    /// Exactly one worker, for debugging and constrained environments.
    pub fn single_threaded() -> Self {
        Self(1)
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::recommended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(WorkerCount::new(0).is_err());
    }

    #[test]
    fn recommended_is_bounded_between_one_and_eight() {
        let wc = WorkerCount::recommended();
        assert!(wc.get() >= 1 && wc.get() <= 8);
    }

    #[test]
    fn single_threaded_is_exactly_one() {
        assert_eq!(WorkerCount::single_threaded().get(), 1);
    }
}
