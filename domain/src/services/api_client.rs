// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # API Client Port
//!
//! The abstraction over the backend's four HTTP endpoints. This is an
//! infrastructure port: the domain layer defines the contract, the
//! engine crate supplies an HTTP-backed implementation.

use crate::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub chunks_length: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    pub code: u32,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckChunkRequest {
    pub token: String,
    pub hash: String,
    pub is_chunk: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckChunkResponse {
    pub code: u32,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckFileRequest {
    pub token: String,
    pub hash: String,
    pub is_chunk: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckFileResponse {
    pub code: u32,
    pub exists: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadChunkResponse {
    pub code: u32,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkRef {
    pub index: u32,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeFileRequest {
    pub token: String,
    pub file_hash: String,
    pub file_name: String,
    pub chunks_length: u64,
    pub chunks: Vec<ChunkRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeFileResponse {
    pub code: u32,
    pub url: String,
}

/// The four-operation backend protocol the Coordinator drives.
///
/// Implementations must treat `is_chunk: true` (`checkChunk`) and
/// `is_chunk: false` (`checkFile`) as the server-side switch between
/// the two dedup probes, and must surface transport failures and
/// response-shape mismatches as `UploadError::NetworkError` /
/// `UploadError::ProtocolError` respectively rather than panicking.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn create_session(&self, req: CreateSessionRequest) -> Result<CreateSessionResponse, UploadError>;

    async fn check_chunk(&self, req: CheckChunkRequest) -> Result<CheckChunkResponse, UploadError>;

    async fn check_file(&self, req: CheckFileRequest) -> Result<CheckFileResponse, UploadError>;

    async fn upload_chunk(&self, token: &str, hash: &str, index: u32, chunk: Vec<u8>) -> Result<UploadChunkResponse, UploadError>;

    async fn merge_file(&self, req: MergeFileRequest) -> Result<MergeFileResponse, UploadError>;
}
