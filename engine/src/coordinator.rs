// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Coordinator (C6)
//!
//! Drives C1–C5 through `Idle → Preparing → Uploading → (Merging |
//! Completed | Failed)` for one upload, handling the `createSession`/
//! `mergeFile` boundary calls, file-level dedup, and cancellation.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use upload_engine_domain::{
    ApiClient, ByteSource, ChunkRef, ChunkSize, CheckFileRequest, CreateSessionRequest, HashService, MergeFileRequest, SessionContext, UploadError,
    UploadEvent, UploadState, WorkerCount,
};

use crate::chunk_planner::ChunkPlanner;
use crate::result_buffer::ResultBuffer;
use crate::task_queue::TaskQueue;
use crate::upload_queue::UploadQueue;
use crate::worker_pool::{WorkerPool, WorkerPoolEvent};

/// The file being uploaded, as seen by the Coordinator. The actual
/// bytes are read lazily through a `ByteSource`; this struct only
/// carries the metadata the protocol needs.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub size: u64,
}

/// Validated, explicit startup options for one upload. No
/// configuration file is read; these are always supplied by the
/// caller.
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    pub chunk_size: ChunkSize,
    pub concurrency: usize,
    pub workers: WorkerCount,
}

impl UploadOptions {
    pub fn new(chunk_size: ChunkSize, concurrency: usize, workers: WorkerCount) -> Result<Self, UploadError> {
        if concurrency == 0 {
            return Err(UploadError::invalid_argument("concurrency must be >= 1"));
        }
        Ok(Self { chunk_size, concurrency, workers })
    }
}

/// A live handle to one upload in progress: an event stream plus the
/// ability to request cancellation.
pub struct UploadHandle {
    events: mpsc::Receiver<UploadEvent>,
    cancellation: CancellationToken,
}

impl UploadHandle {
    /// Waits for the next event. Returns `None` once the upload has
    /// reached a terminal state and the driver task has exited.
    pub async fn recv(&mut self) -> Option<UploadEvent> {
        self.events.recv().await
    }

    /// Requests cancellation. Idempotent and safe at any time.
    pub fn abort(&self) {
        self.cancellation.cancel();
    }

    /// A clone of the underlying cancellation token, for callers that
    /// want to wire external cancellation sources (signal handlers,
    /// parent-scope deadlines) without holding `&mut UploadHandle`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

/// The Coordinator component. Stateless between uploads: one
/// `Coordinator` can drive many sequential `start()` calls, each
/// producing its own `UploadHandle`.
pub struct Coordinator {
    api_client: Arc<dyn ApiClient>,
    hash_service: Arc<dyn HashService>,
}

impl Coordinator {
    pub fn new(api_client: Arc<dyn ApiClient>, hash_service: Arc<dyn HashService>) -> Self {
        Self { api_client, hash_service }
    }

    /// `start(file, cfg)` [Idle → Preparing]. Validates inputs, plans
    /// chunks, and opens a session synchronously; the remainder of the
    /// state machine runs on a spawned task reachable through the
    /// returned `UploadHandle`.
    pub async fn start(&self, file: UploadFile, byte_source: Arc<dyn ByteSource>, options: UploadOptions) -> Result<UploadHandle, UploadError> {
        let plan = ChunkPlanner::new().plan(file.size, options.chunk_size)?;
        let total = plan.len() as u32;

        let session = self
            .api_client
            .create_session(CreateSessionRequest {
                file_name: file.name.clone(),
                file_type: file.content_type.clone(),
                file_size: file.size,
                chunks_length: total as u64,
            })
            .await?;
        let token = session.token;
        info!(target: "coordinator", %token, file_size = file.size, chunks = total, "session created");

        let (event_tx, event_rx) = mpsc::channel(64);
        let cancellation = CancellationToken::new();

        let session = SessionContext::new(token, file.name, file.size, options.concurrency, options.chunk_size.bytes());

        let driver = Driver {
            api_client: self.api_client.clone(),
            hash_service: self.hash_service.clone(),
            byte_source,
            session,
            plan,
            total,
            options,
            event_tx,
            cancellation: cancellation.clone(),
            started_at: Instant::now(),
        };
        tokio::spawn(driver.run());

        Ok(UploadHandle { events: event_rx, cancellation })
    }
}

struct Driver {
    api_client: Arc<dyn ApiClient>,
    hash_service: Arc<dyn HashService>,
    byte_source: Arc<dyn ByteSource>,
    session: SessionContext,
    plan: upload_engine_domain::ChunkPlan,
    total: u32,
    options: UploadOptions,
    event_tx: mpsc::Sender<UploadEvent>,
    cancellation: CancellationToken,
    started_at: Instant,
}

impl Driver {
    async fn run(mut self) {
        self.session.state = UploadState::Uploading;
        info!(target: "coordinator", token = %self.session.token, "uploading started");

        let task_queue = TaskQueue::from_plan(&self.plan);
        let worker_pool = WorkerPool::new(self.options.workers, self.hash_service.clone(), self.byte_source.clone());
        let mut worker_rx = worker_pool.run(task_queue, self.cancellation.clone());

        let mut result_buffer = ResultBuffer::new(self.total, self.hash_service.clone());
        let mut upload_queue = UploadQueue::new(self.options.concurrency, self.session.token.clone(), self.api_client.clone(), self.byte_source.clone());

        let mut chunk_hashes: Vec<Option<String>> = vec![None; self.total as usize];
        let mut file_hash: Option<String> = None;
        let mut terminal = false;

        // Degenerate case: zero chunks. Nothing will ever arrive on
        // either channel, so the drain condition must be primed by hand.
        if self.total == 0 {
            for event in upload_queue.mark_all_chunks_hashed() {
                if self.handle_terminal_side_effect(event, &mut upload_queue, &mut chunk_hashes, &mut file_hash).await {
                    terminal = true;
                }
            }
        }

        while !terminal {
            tokio::select! {
                _ = self.cancellation.cancelled(), if !terminal => {
                    terminal = true;
                    for event in upload_queue.abort(UploadError::Terminated) {
                        self.forward(event).await;
                    }
                    self.emit(UploadEvent::Failed(UploadError::Terminated)).await;
                }
                msg = worker_rx.recv() => {
                    match msg {
                        Some(WorkerPoolEvent::Result(result)) => {
                            for event in result_buffer.add_result(result) {
                                terminal = self.handle_event(event, &mut upload_queue, &mut chunk_hashes, &mut file_hash).await;
                                if terminal {
                                    break;
                                }
                            }
                        }
                        Some(WorkerPoolEvent::Aborted(err)) => {
                            terminal = true;
                            self.emit(UploadEvent::Failed(err)).await;
                        }
                        Some(WorkerPoolEvent::Completed) | Some(WorkerPoolEvent::Terminated) | None => {
                            // Hashing finished or was stopped deliberately (file dedup
                            // hit, or our own cancellation); the upload queue side
                            // drives the remaining state transitions.
                        }
                    }
                }
                outcome = upload_queue.next_outcome_events() => {
                    if let Some(events) = outcome {
                        for event in events {
                            terminal = self.handle_event(event, &mut upload_queue, &mut chunk_hashes, &mut file_hash).await;
                            if terminal {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Applies one `UploadEvent` to the driver's own bookkeeping and
    /// forwards it (or a merge/completion event it causes) downstream.
    /// Returns whether the upload has now reached a terminal state.
    async fn handle_event(
        &mut self,
        event: UploadEvent,
        upload_queue: &mut UploadQueue,
        chunk_hashes: &mut [Option<String>],
        file_hash: &mut Option<String>,
    ) -> bool {
        match event {
            UploadEvent::ChunkHashed(chunk) => {
                chunk_hashes[chunk.index as usize] = Some(chunk.hash.clone());
                self.emit(UploadEvent::ChunkHashed(chunk.clone())).await;
                for downstream in upload_queue.add_chunk_task(chunk) {
                    if self.handle_terminal_side_effect(downstream, upload_queue, chunk_hashes, file_hash).await {
                        return true;
                    }
                }
                false
            }
            UploadEvent::AllChunksHashed => {
                self.emit(UploadEvent::AllChunksHashed).await;
                for downstream in upload_queue.mark_all_chunks_hashed() {
                    if self.handle_terminal_side_effect(downstream, upload_queue, chunk_hashes, file_hash).await {
                        return true;
                    }
                }
                false
            }
            UploadEvent::FileHashed { file_hash: hash } => {
                *file_hash = Some(hash.clone());
                self.emit(UploadEvent::FileHashed { file_hash: hash.clone() }).await;
                self.try_file_dedup(hash, upload_queue).await
            }
            other => self.handle_terminal_side_effect(other, upload_queue, chunk_hashes, file_hash).await,
        }
    }

    /// Handles events that can themselves be terminal (`ChunkUploaded`
    /// is never terminal; `QueueDrained` and `QueueAborted` are).
    async fn handle_terminal_side_effect(
        &mut self,
        event: UploadEvent,
        upload_queue: &mut UploadQueue,
        chunk_hashes: &mut [Option<String>],
        file_hash: &mut Option<String>,
    ) -> bool {
        match event {
            UploadEvent::ChunkUploaded { index } => {
                self.emit(UploadEvent::ChunkUploaded { index }).await;
                false
            }
            UploadEvent::QueueDrained => {
                self.cancellation.cancel(); // hashing is long done by this point; idempotent if already cancelled
                self.emit(UploadEvent::QueueDrained).await;
                self.merge(upload_queue, chunk_hashes, file_hash).await;
                true
            }
            UploadEvent::QueueAborted(err) => {
                self.cancellation.cancel();
                self.emit(UploadEvent::QueueAborted(err.clone())).await;
                self.emit(UploadEvent::Failed(err)).await;
                true
            }
            other => {
                self.emit(other).await;
                false
            }
        }
    }

    /// On a confirmed whole-file hash, probe the server for a
    /// file-level dedup hit. On hit, short-circuits straight to
    /// `Completed` without ever calling `mergeFile`.
    async fn try_file_dedup(&mut self, file_hash: String, upload_queue: &mut UploadQueue) -> bool {
        let probe = self
            .api_client
            .check_file(CheckFileRequest {
                token: self.session.token.clone(),
                hash: file_hash.clone(),
                is_chunk: false,
            })
            .await;

        match probe {
            Ok(resp) if resp.exists => {
                let url = match resp.url.filter(|u| !u.is_empty()) {
                    Some(url) => url,
                    None => {
                        self.cancellation.cancel();
                        let err = UploadError::protocol("checkFile reported exists=true with no url");
                        upload_queue.abort(err.clone());
                        self.emit(UploadEvent::Failed(err)).await;
                        return true;
                    }
                };
                self.cancellation.cancel(); // stop hashing, it is no longer needed
                // markAsCompleted's QueueDrained is an internal bookkeeping
                // signal here, not the drain that triggers merge.
                upload_queue.mark_as_completed();
                info!(target: "coordinator", token = %self.session.token, %url, "file-level dedup hit");
                self.emit(UploadEvent::Completed {
                    url,
                    file_hash,
                    size: self.session.file_size,
                    chunk_count: self.total,
                    duration: self.started_at.elapsed(),
                })
                .await;
                true
            }
            Ok(_) => false,
            Err(err) => {
                self.cancellation.cancel();
                upload_queue.abort(err.clone());
                self.emit(UploadEvent::Failed(err)).await;
                true
            }
        }
    }

    /// `QueueDrained → Merging → Completed`.
    async fn merge(&mut self, upload_queue: &UploadQueue, chunk_hashes: &[Option<String>], file_hash: &mut Option<String>) {
        let _ = upload_queue;
        self.session.state = UploadState::Merging;
        let hash = match file_hash.clone() {
            Some(hash) => hash,
            None => {
                // Defensive: FileHashed always precedes QueueDrained in
                // practice, but recompute rather than panic.
                let hashes: Vec<String> = chunk_hashes.iter().map(|h| h.clone().unwrap_or_default()).collect();
                self.hash_service.digest_chunk_hashes(&hashes)
            }
        };

        let chunks: Vec<ChunkRef> = chunk_hashes
            .iter()
            .enumerate()
            .map(|(index, hash)| ChunkRef {
                index: index as u32,
                hash: hash.clone().unwrap_or_default(),
            })
            .collect();

        let result = self
            .api_client
            .merge_file(MergeFileRequest {
                token: self.session.token.clone(),
                file_hash: hash.clone(),
                file_name: self.session.file_name.clone(),
                chunks_length: chunks.len() as u64,
                chunks,
            })
            .await;

        match result {
            Ok(resp) if resp.url.is_empty() => {
                let err = UploadError::protocol("mergeFile returned an empty url");
                self.emit(UploadEvent::Failed(err)).await;
            }
            Ok(resp) => {
                info!(target: "coordinator", token = %self.session.token, url = %resp.url, "upload completed");
                self.emit(UploadEvent::Completed {
                    url: resp.url,
                    file_hash: hash,
                    size: self.session.file_size,
                    chunk_count: self.total,
                    duration: self.started_at.elapsed(),
                })
                .await;
            }
            Err(err) => {
                self.emit(UploadEvent::Failed(err)).await;
            }
        }
    }

    async fn emit(&mut self, event: UploadEvent) {
        match &event {
            UploadEvent::Completed { url, file_hash, .. } => {
                self.session.state = UploadState::Completed;
                self.session.file_hash = Some(file_hash.clone());
                self.session.download_url = Some(url.clone());
            }
            UploadEvent::Failed(_) => {
                self.session.state = UploadState::Failed;
            }
            _ => {}
        }
        let _ = self.event_tx.send(event).await;
    }

    async fn forward(&mut self, event: UploadEvent) {
        self.emit(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::byte_source::InMemoryByteSource;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use upload_engine_domain::{
        CheckChunkRequest, CheckChunkResponse, CheckFileResponse, CreateSessionResponse, Md5HashService, MergeFileResponse, UploadChunkResponse,
    };

    #[derive(Default)]
    struct FakeBackend {
        dedup_chunk_hashes: std::collections::HashSet<String>,
        file_dedup: Option<String>,
        file_dedup_missing_url: bool,
        fail_chunk_hash: Option<String>,
        merge_fails: bool,
        merge_returns_empty_url: bool,
    }

    struct FakeApiClient {
        backend: StdMutex<FakeBackend>,
        sessions: StdMutex<HashMap<String, u64>>,
    }

    impl FakeApiClient {
        fn new(backend: FakeBackend) -> Self {
            Self {
                backend: StdMutex::new(backend),
                sessions: StdMutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ApiClient for FakeApiClient {
        async fn create_session(&self, req: CreateSessionRequest) -> Result<CreateSessionResponse, UploadError> {
            let token = format!("tok-{}", req.file_name);
            self.sessions.lock().unwrap().insert(token.clone(), req.chunks_length);
            Ok(CreateSessionResponse { code: 200, token })
        }

        async fn check_chunk(&self, req: CheckChunkRequest) -> Result<CheckChunkResponse, UploadError> {
            let backend = self.backend.lock().unwrap();
            Ok(CheckChunkResponse {
                code: 200,
                exists: backend.dedup_chunk_hashes.contains(&req.hash),
            })
        }

        async fn check_file(&self, req: CheckFileRequest) -> Result<CheckFileResponse, UploadError> {
            let backend = self.backend.lock().unwrap();
            match &backend.file_dedup {
                Some(hash) if hash == &req.hash => Ok(CheckFileResponse {
                    code: 200,
                    exists: true,
                    url: if backend.file_dedup_missing_url { None } else { Some("deduped.zip".to_string()) },
                }),
                _ => Ok(CheckFileResponse { code: 200, exists: false, url: None }),
            }
        }

        async fn upload_chunk(&self, _token: &str, hash: &str, _index: u32, _chunk: Vec<u8>) -> Result<UploadChunkResponse, UploadError> {
            let backend = self.backend.lock().unwrap();
            if backend.fail_chunk_hash.as_deref() == Some(hash) {
                return Err(UploadError::network("simulated failure"));
            }
            Ok(UploadChunkResponse { code: 200, success: true })
        }

        async fn merge_file(&self, _req: MergeFileRequest) -> Result<MergeFileResponse, UploadError> {
            let backend = self.backend.lock().unwrap();
            if backend.merge_fails {
                return Err(UploadError::network("merge failed"));
            }
            let url = if backend.merge_returns_empty_url { String::new() } else { "merged.zip".to_string() };
            Ok(MergeFileResponse { code: 200, url })
        }
    }

    fn options(chunk_size: u64, concurrency: usize) -> UploadOptions {
        UploadOptions::new(ChunkSize::new(chunk_size).unwrap(), concurrency, WorkerCount::new(2).unwrap()).unwrap()
    }

    async fn drain_all(handle: &mut UploadHandle) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.recv().await {
            let is_terminal = matches!(event, UploadEvent::Completed { .. } | UploadEvent::Failed(_));
            events.push(event);
            if is_terminal {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn exact_multiple_upload_completes_with_merge() {
        let api = Arc::new(FakeApiClient::new(FakeBackend::default()));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let bytes = vec![0u8; 200];
        let byte_source = Arc::new(InMemoryByteSource::new(bytes));

        let file = UploadFile {
            name: "a.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 200,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        let chunk_hashed = events.iter().filter(|e| matches!(e, UploadEvent::ChunkHashed(_))).count();
        assert_eq!(chunk_hashed, 2);
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::AllChunksHashed)).count(), 1);
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::FileHashed { .. })).count(), 1);
        match events.last() {
            Some(UploadEvent::Completed { size, chunk_count, .. }) => {
                assert_eq!(*size, 200);
                assert_eq!(*chunk_count, 2);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_file_merges_with_zero_chunks() {
        let api = Arc::new(FakeApiClient::new(FakeBackend::default()));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![]));

        let file = UploadFile {
            name: "empty.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        match events.last() {
            Some(UploadEvent::Completed { size, chunk_count, .. }) => {
                assert_eq!(*size, 0);
                assert_eq!(*chunk_count, 0);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::ChunkHashed(_))).count(), 0);
    }

    #[tokio::test]
    async fn file_dedup_hit_skips_merge() {
        let md5 = Md5HashService;
        let file_hash = md5.digest_chunk_hashes(&[md5.digest(&vec![7u8; 100])]);
        let backend = FakeBackend {
            file_dedup: Some(file_hash),
            ..Default::default()
        };
        let api = Arc::new(FakeApiClient::new(backend));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![7u8; 100]));

        let file = UploadFile {
            name: "dedup.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 100,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        match events.last() {
            Some(UploadEvent::Completed { url, size, chunk_count, .. }) => {
                assert_eq!(url, "deduped.zip");
                assert_eq!(*size, 100);
                assert_eq!(*chunk_count, 1);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_dedup_hit_without_url_fails_with_protocol_error() {
        let md5 = Md5HashService;
        let file_hash = md5.digest_chunk_hashes(&[md5.digest(&vec![7u8; 100])]);
        let backend = FakeBackend {
            file_dedup: Some(file_hash),
            file_dedup_missing_url: true,
            ..Default::default()
        };
        let api = Arc::new(FakeApiClient::new(backend));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![7u8; 100]));

        let file = UploadFile {
            name: "dedup-no-url.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 100,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        match events.last() {
            Some(UploadEvent::Failed(UploadError::ProtocolError(_))) => {}
            other => panic!("expected Failed(ProtocolError), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn merge_with_empty_url_fails_with_protocol_error() {
        let backend = FakeBackend {
            merge_returns_empty_url: true,
            ..Default::default()
        };
        let api = Arc::new(FakeApiClient::new(backend));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![0u8; 100]));

        let file = UploadFile {
            name: "merge-no-url.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 100,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        match events.last() {
            Some(UploadEvent::Failed(UploadError::ProtocolError(_))) => {}
            other => panic!("expected Failed(ProtocolError), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chunk_upload_failure_yields_single_failed_event() {
        let backend = FakeBackend {
            fail_chunk_hash: Some(Md5HashService.digest(&vec![1u8; 100])),
            ..Default::default()
        };
        let api = Arc::new(FakeApiClient::new(backend));
        let coordinator = Coordinator::new(api, Arc::new(Md5HashService));
        let mut bytes = vec![1u8; 100];
        bytes.extend(vec![2u8; 100]);
        let byte_source = Arc::new(InMemoryByteSource::new(bytes));

        let file = UploadFile {
            name: "fails.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 200,
        };
        let mut handle = coordinator.start(file, byte_source, options(100, 4)).await.unwrap();
        let events = drain_all(&mut handle).await;

        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::Failed(_))).count(), 1);
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::QueueAborted(_))).count(), 1);
    }
}
