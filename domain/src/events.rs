// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Events
//!
//! The concrete event vocabulary the engine emits: one authoritative
//! state machine per upload, with progress and history as projections
//! over these events rather than separate services.

use crate::UploadError;
use crate::tasks::HashedChunk;
use std::time::Duration;

/// An event produced while driving one upload to completion.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Chunk `index` has a confirmed hash, emitted in strictly
    /// ascending index order.
    ChunkHashed(HashedChunk),
    /// All `N` chunks have been hashed; always precedes `FileHashed`.
    AllChunksHashed,
    /// The whole-file digest, computed once all chunk hashes are
    /// known.
    FileHashed { file_hash: String },
    /// One chunk finished its upload (or was deduped).
    ChunkUploaded { index: u32 },
    /// Every chunk is accounted for and nothing is in flight.
    QueueDrained,
    /// The upload queue hit an unrecoverable error and aborted.
    QueueAborted(UploadError),
    /// A coarse progress snapshot, suitable for a UI.
    UploadProgress { completed: u64, total: u64 },
    /// Terminal success, carrying the download URL, whole-file hash,
    /// byte size, chunk count, and wall-clock duration.
    Completed {
        url: String,
        file_hash: String,
        size: u64,
        chunk_count: u32,
        duration: Duration,
    },
    /// Terminal failure.
    Failed(UploadError),
}
