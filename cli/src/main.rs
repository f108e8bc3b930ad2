// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Engine CLI
//!
//! Entry point for the `upload` binary: parses and validates
//! arguments, wires the engine's concrete adapters to the Coordinator,
//! drives one upload to completion while reporting progress, and maps
//! the outcome to a process exit code.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use upload_engine::infrastructure::{EngineMetrics, FileByteSource, HttpApiClient, MetricsEndpoint};
use upload_engine::{Coordinator, EngineConfig, UploadFile, UploadOptions};
use upload_engine_cli::signals::create_signal_handler;
use upload_engine_cli::{exit_code_for_upload_error, Cli, ExitCode};
use upload_engine_domain::{ByteSource, Md5HashService, UploadError, UploadEvent, WorkerCount};

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code.as_i32());
}

async fn run() -> ExitCode {
    let args = match Cli::parse_and_validate() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("upload: {e}");
            return ExitCode::UsageError;
        }
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if args.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("upload: failed to install tracing subscriber");
    }

    info!(file = %args.file.display(), api_base_url = %args.api_base_url, "starting upload");

    let metrics = match EngineMetrics::new() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!(error = %e, "failed to initialize metrics");
            return exit_code_for_upload_error(&e);
        }
    };

    if let Some(addr) = args.metrics_addr.clone() {
        let endpoint = MetricsEndpoint::new(metrics.clone());
        debug!(%addr, "metrics endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = endpoint.start(&addr).await {
                error!(error = %e, "metrics endpoint terminated");
            }
        });
    }

    match upload(&args, metrics.clone()).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!(error = %e, category = e.category(), "upload failed");
            exit_code_for_upload_error(&e)
        }
    }
}

async fn upload(args: &upload_engine_cli::UploadArgs, metrics: Arc<EngineMetrics>) -> Result<(), UploadError> {
    let workers = args.workers.unwrap_or_else(|| WorkerCount::recommended().get());
    let config = EngineConfig::new(args.api_base_url.clone(), args.chunk_size, args.concurrency, workers)?.with_request_timeout(args.request_timeout);
    let options = UploadOptions::new(config.chunk_size, config.concurrency, config.workers)?;

    let byte_source = Arc::new(FileByteSource::open(&args.file).await?);
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string());

    let file = UploadFile {
        name: file_name,
        content_type: "application/octet-stream".to_string(),
        size: byte_source.len(),
    };

    let api_client = Arc::new(HttpApiClient::new(config.api_base_url.clone(), config.request_timeout)?);
    let coordinator = Coordinator::new(api_client, Arc::new(Md5HashService));

    metrics.upload_started();
    let mut handle = coordinator.start(file, byte_source, options).await?;

    let signal_handler = create_signal_handler();
    let cancel_token = handle.cancellation_token();
    let shutdown_watch = tokio::spawn(async move {
        signal_handler
            .wait_for_signal(Box::new(move || {
                warn!("shutdown requested, aborting in-flight upload");
                cancel_token.cancel();
            }))
            .await;
    });

    let result = drive(&mut handle, &metrics).await;
    shutdown_watch.abort();
    metrics.upload_finished();
    result
}

async fn drive(handle: &mut upload_engine::UploadHandle, metrics: &EngineMetrics) -> Result<(), UploadError> {
    let mut chunk_sizes = std::collections::HashMap::new();

    while let Some(event) = handle.recv().await {
        match event {
            UploadEvent::ChunkHashed(chunk) => {
                metrics.record_chunk_hashed();
                chunk_sizes.insert(chunk.index, chunk.size());
                debug!(index = chunk.index, hash = %chunk.hash, "chunk hashed");
            }
            UploadEvent::AllChunksHashed => debug!("all chunks hashed"),
            UploadEvent::FileHashed { file_hash } => info!(%file_hash, "file hash computed"),
            UploadEvent::ChunkUploaded { index } => {
                let size = chunk_sizes.remove(&index).unwrap_or(0);
                metrics.record_chunk_uploaded(size);
                debug!(index, size, "chunk uploaded");
            }
            UploadEvent::QueueDrained => debug!("upload queue drained"),
            UploadEvent::QueueAborted(e) => return Err(e),
            UploadEvent::UploadProgress { completed, total } => {
                info!(completed, total, "progress");
            }
            UploadEvent::Completed { url, file_hash, size, chunk_count, duration } => {
                info!(%url, %file_hash, size, chunk_count, duration_ms = duration.as_millis() as u64, "upload completed");
                println!("uploaded: {url} ({file_hash}, {size} bytes, {chunk_count} chunks, {:.2}s)", duration.as_secs_f64());
                return Ok(());
            }
            UploadEvent::Failed(e) => return Err(e),
        }
    }
    Err(UploadError::worker("upload event stream closed before a terminal event"))
}
