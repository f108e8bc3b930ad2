// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Context and Upload State
//!
//! `SessionContext` is the data the Coordinator accumulates over the
//! lifetime of one upload. `UploadState` is the state machine it moves
//! through.

use serde::{Deserialize, Serialize};

/// The Coordinator's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    Idle,
    Preparing,
    Uploading,
    Merging,
    Completed,
    Failed,
}

/// Accumulated context for one upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: String,
    pub file_name: String,
    pub file_size: u64,
    pub concurrency: usize,
    pub chunk_size: u64,
    pub state: UploadState,
    /// Set exactly once, when the Result Buffer emits `FileHashed`.
    pub file_hash: Option<String>,
    /// Set exactly once, on terminal success.
    pub download_url: Option<String>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, file_name: impl Into<String>, file_size: u64, concurrency: usize, chunk_size: u64) -> Self {
        Self {
            token: token.into(),
            file_name: file_name.into(),
            file_size,
            concurrency,
            chunk_size,
            state: UploadState::Preparing,
            file_hash: None,
            download_url: None,
        }
    }
}
