// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP API Client
//!
//! The one shipped `ApiClient`: a thin `reqwest`-backed adapter over
//! the backend's four JSON/multipart endpoints. Transport failures and
//! non-2xx responses become `UploadError::NetworkError`; a response
//! body that does not match the expected shape becomes
//! `UploadError::ProtocolError`. No retry logic lives here — retries
//! are a wrapper concern layered over this client, not inside it.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use upload_engine_domain::{
    ApiClient, CheckChunkRequest, CheckChunkResponse, CheckFileRequest, CheckFileResponse, CreateSessionRequest, CreateSessionResponse,
    MergeFileRequest, MergeFileResponse, UploadChunkResponse, UploadError,
};

/// `ApiClient` backed by `reqwest::Client`. Holds only a base URL and
/// request timeout; not a session or retry cache.
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    /// Builds a client against `base_url` with `request_timeout` applied
    /// to every request.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| UploadError::invalid_argument(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn post_json<Req: serde::Serialize + Sync, Resp: serde::de::DeserializeOwned>(&self, path: &str, body: &Req) -> Result<Resp, UploadError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| UploadError::network(format!("{path}: {e}")))?;

        check_status(path, response.status())?;

        let bytes = response.bytes().await.map_err(|e| UploadError::network(format!("{path}: failed to read body: {e}")))?;
        serde_json::from_slice::<Resp>(&bytes).map_err(|e| UploadError::protocol(format!("{path}: unexpected response shape: {e}")))
    }
}

fn check_status(path: &str, status: StatusCode) -> Result<(), UploadError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(UploadError::network(format!("{path}: server returned {status}")))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn create_session(&self, req: CreateSessionRequest) -> Result<CreateSessionResponse, UploadError> {
        self.post_json("createSession", &req).await
    }

    async fn check_chunk(&self, req: CheckChunkRequest) -> Result<CheckChunkResponse, UploadError> {
        self.post_json("checkChunk", &req).await
    }

    async fn check_file(&self, req: CheckFileRequest) -> Result<CheckFileResponse, UploadError> {
        self.post_json("checkFile", &req).await
    }

    async fn upload_chunk(&self, token: &str, hash: &str, index: u32, chunk: Vec<u8>) -> Result<UploadChunkResponse, UploadError> {
        let form = reqwest::multipart::Form::new()
            .text("token", token.to_string())
            .text("hash", hash.to_string())
            .text("index", index.to_string())
            .part("chunk", reqwest::multipart::Part::bytes(chunk).file_name("chunk"));

        let response = self
            .client
            .post(self.url("uploadChunk"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::network(format!("uploadChunk: {e}")))?;

        check_status("uploadChunk", response.status())?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UploadError::network(format!("uploadChunk: failed to read body: {e}")))?;
        serde_json::from_slice::<UploadChunkResponse>(&bytes).map_err(|e| UploadError::protocol(format!("uploadChunk: unexpected response shape: {e}")))
    }

    async fn merge_file(&self, req: MergeFileRequest) -> Result<MergeFileResponse, UploadError> {
        self.post_json("mergeFile", &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_regardless_of_slashes() {
        let client = HttpApiClient::new("http://localhost:8080/", Duration::from_secs(30)).unwrap();
        assert_eq!(client.url("/createSession"), "http://localhost:8080/createSession");

        let client = HttpApiClient::new("http://localhost:8080", Duration::from_secs(30)).unwrap();
        assert_eq!(client.url("createSession"), "http://localhost:8080/createSession");
    }
}
