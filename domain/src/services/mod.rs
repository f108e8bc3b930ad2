// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

mod api_client;
mod byte_source;
mod hash_service;

pub use api_client::{
    ApiClient, CheckChunkRequest, CheckChunkResponse, CheckFileRequest, CheckFileResponse, ChunkRef, CreateSessionRequest,
    CreateSessionResponse, MergeFileRequest, MergeFileResponse, UploadChunkResponse,
};
pub use byte_source::ByteSource;
pub use hash_service::{HashService, Md5HashService};
