// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Engine Domain
//!
//! Pure, reusable business logic for the chunked upload engine: the
//! value objects, task/event data model, the `ApiClient` port, and the
//! `HashService` port. No tokio, no HTTP client, no logging backend —
//! those are infrastructure concerns that live in the `engine` crate.

pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod session;
pub mod tasks;
pub mod value_objects;

pub use entities::QueueStats;
pub use error::UploadError;
pub use events::UploadEvent;
pub use services::{
    ApiClient, ByteSource, CheckChunkRequest, CheckChunkResponse, CheckFileRequest, CheckFileResponse, ChunkRef, CreateSessionRequest,
    CreateSessionResponse, HashService, Md5HashService, MergeFileRequest, MergeFileResponse, UploadChunkResponse,
};
pub use session::{SessionContext, UploadState};
pub use tasks::{HashResult, HashTask, HashedChunk, UploadTask, UploadTaskStatus};
pub use value_objects::{ChunkPlan, ChunkRange, ChunkSize, WorkerCount};
