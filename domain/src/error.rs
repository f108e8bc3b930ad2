// /////////////////////////////////////////////////////////////////////////////
// Optimized Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Engine Error System
//!
//! A single, flat error enum for the chunked upload engine. Errors are
//! categorized by *kind*, not by originating module, so that the
//! Coordinator can decide `retryable` purely from the variant.

use thiserror::Error;

/// Errors surfaced anywhere in the upload engine: `InvalidArgument`,
/// `NetworkError`, `WorkerError`, `ProtocolError`, `Terminated`.
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("worker error: {0}")]
    WorkerError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("terminated")]
    Terminated,
}

impl UploadError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Stable category string, used for logging and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            UploadError::InvalidArgument(_) => "invalid_argument",
            UploadError::NetworkError(_) => "network",
            UploadError::WorkerError(_) => "worker",
            UploadError::ProtocolError(_) => "protocol",
            UploadError::Terminated => "terminated",
        }
    }

    /// Whether the caller may reasonably retry the whole upload.
    ///
    /// `InvalidArgument` and `ProtocolError` are not retryable: retrying
    /// with the same inputs/server contract will fail identically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::NetworkError(_) | UploadError::WorkerError(_))
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::ProtocolError(err.to_string())
    }
}
