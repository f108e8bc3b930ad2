// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! No configuration *file* is read: every field here is supplied
//! explicitly by the caller, typically parsed from CLI flags.
//! `EngineConfig::new` validates `chunkSize` and `concurrency` up front
//! and rejects invalid values with `UploadError::InvalidArgument`
//! before any I/O happens.

use std::time::Duration;
use upload_engine_domain::{ChunkSize, UploadError, WorkerCount};

/// Default bounded concurrency for the Upload Queue.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default HTTP request timeout applied by `HttpApiClient`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated, explicit configuration for one engine process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub chunk_size: ChunkSize,
    pub concurrency: usize,
    pub workers: WorkerCount,
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Builds a config from raw CLI-shaped values, validating
    /// `chunk_size_bytes` and `concurrency` before returning.
    pub fn new(api_base_url: impl Into<String>, chunk_size_bytes: u64, concurrency: usize, workers: usize) -> Result<Self, UploadError> {
        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(UploadError::invalid_argument("apiBaseURL must not be empty"));
        }
        let chunk_size = ChunkSize::new(chunk_size_bytes)?;
        if concurrency == 0 {
            return Err(UploadError::invalid_argument("concurrency must be at least 1"));
        }
        let workers = WorkerCount::new(workers)?;

        Ok(Self {
            api_base_url,
            chunk_size,
            concurrency,
            workers,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    /// `workers = max(1, min(8, num_cpus))`, `concurrency = 4`, 1MB
    /// chunks, localhost backend — a starting point for local testing,
    /// never used to silently fill in a missing `--api-base-url`.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            chunk_size: ChunkSize::default(),
            concurrency: DEFAULT_CONCURRENCY,
            workers: WorkerCount::recommended(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(EngineConfig::new("http://localhost", 0, 4, 2).is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(EngineConfig::new("http://localhost", 1024, 0, 2).is_err());
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(EngineConfig::new("  ", 1024, 4, 2).is_err());
    }

    #[test]
    fn valid_inputs_build_a_config() {
        let cfg = EngineConfig::new("http://localhost:8080", 1024 * 1024, 4, 2).unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.workers.get(), 2);
        assert_eq!(cfg.chunk_size.bytes(), 1024 * 1024);
    }

    #[test]
    fn default_matches_spec_recommendations() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
        assert!(cfg.workers.get() >= 1 && cfg.workers.get() <= 8);
    }
}
