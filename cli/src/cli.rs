// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. Cli::parse()                    │  Parse with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. Cli::validate()                 │  Security + range validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. UploadArgs                      │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```

use crate::validator::{ParseError, SecureArgParser};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Upload a file to a chunked-upload backend, hashing and
/// deduplicating chunks in parallel before transfer.
#[derive(Parser, Debug, Clone)]
#[command(name = "upload")]
#[command(about = concat!("Resumable chunked upload engine v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    /// File to upload
    pub file: PathBuf,

    /// Base URL of the upload backend
    #[arg(long, default_value = "http://localhost:8080")]
    pub api_base_url: String,

    /// Chunk size in bytes
    #[arg(long, default_value = "4194304")]
    pub chunk_size: u64,

    /// Maximum in-flight chunks (hashed but not yet uploaded)
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Number of parallel hashing workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-request timeout, in seconds, for the backend HTTP calls
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Address to serve Prometheus metrics and a health check on, e.g. `127.0.0.1:9898`
    #[arg(long)]
    pub metrics_addr: Option<String>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated CLI arguments.
///
/// All string/path arguments have passed [`SecureArgParser`] and all
/// numeric arguments have passed range checks, before any session is
/// created or byte touched on disk.
#[derive(Debug, Clone)]
pub struct UploadArgs {
    pub file: PathBuf,
    pub api_base_url: String,
    pub chunk_size: u64,
    pub concurrency: usize,
    pub workers: Option<usize>,
    pub request_timeout: Duration,
    pub metrics_addr: Option<String>,
    pub verbose: bool,
}

impl Cli {
    /// Parse `std::env::args()` and validate the result.
    pub fn parse_and_validate() -> Result<UploadArgs, ParseError> {
        <Self as Parser>::parse().validate()
    }

    /// Apply security and range validation to already-parsed arguments.
    pub fn validate(self) -> Result<UploadArgs, ParseError> {
        let file = SecureArgParser::validate_path(&self.file.to_string_lossy())?;

        SecureArgParser::validate_argument(&self.api_base_url)?;
        if self.api_base_url.trim().is_empty() {
            return Err(ParseError::InvalidValue {
                arg: "api-base-url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.chunk_size == 0 {
            return Err(ParseError::InvalidValue {
                arg: "chunk-size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.concurrency == 0 {
            return Err(ParseError::InvalidValue {
                arg: "concurrency".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(ParseError::InvalidValue {
                    arg: "workers".to_string(),
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ParseError::InvalidValue {
                arg: "request-timeout-secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if let Some(ref addr) = self.metrics_addr {
            SecureArgParser::validate_argument(addr)?;
        }

        Ok(UploadArgs {
            file,
            api_base_url: self.api_base_url,
            chunk_size: self.chunk_size,
            concurrency: self.concurrency,
            workers: self.workers,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            metrics_addr: self.metrics_addr,
            verbose: self.verbose,
        })
    }
}
