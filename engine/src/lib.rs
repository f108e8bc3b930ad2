// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Engine
//!
//! The application and infrastructure layer for the chunked upload
//! engine: the six pipeline components (C1–C6) and the concrete
//! adapters (HTTP client, file I/O, metrics) that plug into the
//! `upload-engine-domain` ports.

pub mod chunk_planner;
pub mod config;
pub mod infrastructure;
pub mod result_buffer;
pub mod task_queue;
pub mod upload_queue;
pub mod worker_pool;

mod coordinator;

pub use chunk_planner::ChunkPlanner;
pub use config::EngineConfig;
pub use coordinator::{Coordinator, UploadFile, UploadHandle, UploadOptions};
pub use result_buffer::ResultBuffer;
pub use task_queue::TaskQueue;
pub use upload_queue::UploadQueue;
pub use worker_pool::{WorkerPool, WorkerPoolEvent};
