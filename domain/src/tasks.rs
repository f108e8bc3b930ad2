// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Task and Result Types
//!
//! The data that flows between C1–C5: hash tasks fed to the Worker
//! Pool, hash results it returns, the reordered `HashedChunk` the
//! Result Buffer produces, and the `UploadTask` the Upload Queue
//! tracks per chunk.

use crate::value_objects::ChunkRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of hashing work dispatched to one worker.
///
/// `sliceRef` is deliberately not a byte buffer: it is the byte range
/// to read, resolved against the input blob by whoever executes the
/// task. The engine never materializes the whole file in memory.
#[derive(Debug, Clone)]
pub struct HashTask {
    pub task_id: Uuid,
    pub index: u32,
    pub range: ChunkRange,
}

impl HashTask {
    pub fn new(range: ChunkRange) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            index: range.index,
            range,
        }
    }
}

/// The digest a worker computed for one chunk.
#[derive(Debug, Clone)]
pub struct HashResult {
    pub index: u32,
    pub hash: String,
    pub range: ChunkRange,
}

/// A chunk whose hash is now known, emitted by the Result Buffer in
/// strictly ascending `index` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedChunk {
    pub index: u32,
    pub start: u64,
    pub end: u64,
    pub hash: String,
}

impl HashedChunk {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Lifecycle state of one chunk's upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadTaskStatus {
    Pending,
    InFlight,
    Completed,
    Failed,
}

/// One upload attempt for a hashed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub index: u32,
    pub hash: String,
    pub start: u64,
    pub end: u64,
    pub status: UploadTaskStatus,
}

impl UploadTask {
    pub fn pending(chunk: &HashedChunk) -> Self {
        Self {
            index: chunk.index,
            hash: chunk.hash.clone(),
            start: chunk.start,
            end: chunk.end,
            status: UploadTaskStatus::Pending,
        }
    }
}
