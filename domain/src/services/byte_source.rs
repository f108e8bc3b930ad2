// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Byte Source Port
//!
//! An async infrastructure port over the input blob. Both the Worker
//! Pool and the Upload Queue read byte ranges through this trait rather
//! than holding the whole file in memory — the engine never
//! materializes the full file size in a single buffer.

use crate::UploadError;
use async_trait::async_trait;

/// A read-only, concurrently-sliceable view over the input blob.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Reads the half-open byte range `[start, end)`.
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError>;

    /// Total length of the blob in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
