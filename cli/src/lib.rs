// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Bootstrap
//!
//! The bootstrap layer for the `upload` binary: it sits outside the
//! domain/engine layers and handles argument parsing, signal
//! handling, and exit-code mapping so `main.rs` can stay a thin
//! wiring script.
//!
//! ## Module Structure
//!
//! - `cli` — `clap`-derived argument parsing for the `upload` command
//! - `signals` — SIGTERM/SIGINT/SIGHUP handling
//! - `shutdown` — cancellation-token-based shutdown coordination
//! - `exit_code` — Unix exit code enumeration (BSD `sysexits.h`)
//! - `logger` — bootstrap-phase logging, used before `tracing` is installed
//! - `validator` — security-first validation of parsed CLI arguments

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;
pub mod validator;

pub use cli::{Cli, UploadArgs};
pub use exit_code::ExitCode;

use upload_engine_domain::UploadError;

/// Maps an `UploadError` to the exit code `main` should return,
/// following the category → `sysexits.h` convention used for domain
/// errors elsewhere in this bootstrap layer.
pub fn exit_code_for_upload_error(error: &UploadError) -> ExitCode {
    match error {
        UploadError::InvalidArgument(_) => ExitCode::UsageError,
        UploadError::NetworkError(_) => ExitCode::Unavailable,
        UploadError::WorkerError(_) => ExitCode::Software,
        UploadError::ProtocolError(_) => ExitCode::Protocol,
        UploadError::Terminated => ExitCode::Interrupted,
    }
}
