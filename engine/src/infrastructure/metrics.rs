// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Metrics
//!
//! A small Prometheus-backed counter/gauge set for the handful of
//! events this engine actually emits, plus a lightweight HTTP endpoint
//! for scraping. No per-stage histogram framework, no external metrics
//! aggregation.

use prometheus::{IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use upload_engine_domain::UploadError;

const NAMESPACE: &str = "upload_engine";

/// Prometheus metrics for one engine process.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,
    chunks_hashed_total: IntCounter,
    chunks_uploaded_total: IntCounter,
    bytes_uploaded_total: IntCounter,
    active_uploads: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, UploadError> {
        let registry = Registry::new();

        let chunks_hashed_total = IntCounter::with_opts(Opts::new("chunks_hashed_total", "Total chunks hashed").namespace(NAMESPACE))
            .map_err(|e| UploadError::invalid_argument(format!("failed to create chunks_hashed_total metric: {e}")))?;
        let chunks_uploaded_total = IntCounter::with_opts(Opts::new("chunks_uploaded_total", "Total chunks uploaded or deduped").namespace(NAMESPACE))
            .map_err(|e| UploadError::invalid_argument(format!("failed to create chunks_uploaded_total metric: {e}")))?;
        let bytes_uploaded_total = IntCounter::with_opts(Opts::new("bytes_uploaded_total", "Total bytes transferred to the backend").namespace(NAMESPACE))
            .map_err(|e| UploadError::invalid_argument(format!("failed to create bytes_uploaded_total metric: {e}")))?;
        let active_uploads = IntGauge::with_opts(Opts::new("active_uploads", "Number of uploads currently in progress").namespace(NAMESPACE))
            .map_err(|e| UploadError::invalid_argument(format!("failed to create active_uploads metric: {e}")))?;

        registry
            .register(Box::new(chunks_hashed_total.clone()))
            .map_err(|e| UploadError::invalid_argument(format!("failed to register chunks_hashed_total: {e}")))?;
        registry
            .register(Box::new(chunks_uploaded_total.clone()))
            .map_err(|e| UploadError::invalid_argument(format!("failed to register chunks_uploaded_total: {e}")))?;
        registry
            .register(Box::new(bytes_uploaded_total.clone()))
            .map_err(|e| UploadError::invalid_argument(format!("failed to register bytes_uploaded_total: {e}")))?;
        registry
            .register(Box::new(active_uploads.clone()))
            .map_err(|e| UploadError::invalid_argument(format!("failed to register active_uploads: {e}")))?;

        Ok(Self {
            registry: Arc::new(registry),
            chunks_hashed_total,
            chunks_uploaded_total,
            bytes_uploaded_total,
            active_uploads,
        })
    }

    pub fn record_chunk_hashed(&self) {
        self.chunks_hashed_total.inc();
    }

    pub fn record_chunk_uploaded(&self, bytes: u64) {
        self.chunks_uploaded_total.inc();
        self.bytes_uploaded_total.inc_by(bytes);
    }

    pub fn upload_started(&self) {
        self.active_uploads.inc();
    }

    pub fn upload_finished(&self) {
        self.active_uploads.dec();
    }

    /// Renders the current registry in Prometheus text exposition
    /// format.
    pub fn render(&self) -> Result<String, UploadError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|e| UploadError::invalid_argument(format!("failed to encode metrics: {e}")))
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new().expect("default EngineMetrics registry must construct cleanly")
    }
}

/// A lightweight hand-rolled `/metrics` + `/health` HTTP server: no web
/// framework, just a raw `TcpListener` and string-based request
/// parsing.
pub struct MetricsEndpoint {
    metrics: Arc<EngineMetrics>,
}

impl MetricsEndpoint {
    pub fn new(metrics: Arc<EngineMetrics>) -> Self {
        Self { metrics }
    }

    /// Binds `addr` and serves requests until the process exits. Never
    /// returns normally.
    pub async fn start(&self, addr: &str) -> Result<(), UploadError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| UploadError::invalid_argument(format!("failed to bind metrics endpoint on {addr}: {e}")))?;

        info!(target: "metrics", %addr, "metrics endpoint listening");

        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let metrics = self.metrics.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_request(&mut stream, metrics).await {
                            error!(target: "metrics", error = %e, "error handling metrics request");
                        }
                    });
                }
                Err(e) => error!(target: "metrics", error = %e, "error accepting connection"),
            }
        }
    }
}

async fn handle_request(stream: &mut tokio::net::TcpStream, metrics: Arc<EngineMetrics>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);
    debug!(target: "metrics", line = %request.lines().next().unwrap_or(""), "received request");

    if request.starts_with("GET /metrics") {
        match metrics.render() {
            Ok(body) => {
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).await?;
            }
            Err(e) => {
                let body = format!("error generating metrics: {e}");
                let response = format!("HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
                stream.write_all(response.as_bytes()).await?;
            }
        }
    } else if request.starts_with("GET /health") {
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK")
            .await?;
    } else {
        stream
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nNot Found")
            .await?;
    }

    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registry_renders_without_error() {
        let metrics = EngineMetrics::new().unwrap();
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("upload_engine_chunks_hashed_total"));
    }

    #[test]
    fn counters_accumulate() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.record_chunk_hashed();
        metrics.record_chunk_hashed();
        metrics.record_chunk_uploaded(100);
        metrics.upload_started();

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("upload_engine_chunks_hashed_total 2"));
        assert!(rendered.contains("upload_engine_chunks_uploaded_total 1"));
        assert!(rendered.contains("upload_engine_bytes_uploaded_total 100"));
        assert!(rendered.contains("upload_engine_active_uploads 1"));
    }
}
