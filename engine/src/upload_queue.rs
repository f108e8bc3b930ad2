// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Queue (C5)
//!
//! Bounded-concurrency consumer of hashed chunks: probe dedup, else
//! upload, fail-fast on the first error.
//!
//! All bookkeeping (`stats`, `tasks`, `terminal`) is mutated only from
//! methods called on the Coordinator's single task — a "coordinator
//! plane" discipline that keeps every state transition atomic from the
//! driver's point of view. Per-chunk work (`process(t)`) runs as
//! spawned tasks that report back over `outcome_tx`; they observe
//! `terminal_flag`, an `AtomicBool` set whenever this struct
//! transitions to a terminal state, to re-check fail-fast after each
//! await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use upload_engine_domain::{ApiClient, ByteSource, HashedChunk, QueueStats, UploadError, UploadEvent, UploadTask, UploadTaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Active,
    Aborted,
    Completed,
}

enum TaskOutcome {
    Completed { index: u32 },
    Failed { index: u32, error: UploadError },
}

/// The Upload Queue component. One instance per upload.
pub struct UploadQueue {
    concurrency: usize,
    stats: QueueStats,
    tasks: Vec<UploadTask>,
    pending_indices: VecDeque<u32>,
    terminal: Terminal,
    terminal_flag: Arc<AtomicBool>,
    drained_emitted: bool,
    aborted_emitted: bool,
    token: String,
    api_client: Arc<dyn ApiClient>,
    byte_source: Arc<dyn ByteSource>,
    outcome_tx: mpsc::Sender<TaskOutcome>,
    outcome_rx: mpsc::Receiver<TaskOutcome>,
}

impl UploadQueue {
    pub fn new(concurrency: usize, token: impl Into<String>, api_client: Arc<dyn ApiClient>, byte_source: Arc<dyn ByteSource>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(32);
        Self {
            concurrency: concurrency.max(1),
            stats: QueueStats::new(),
            tasks: Vec::new(),
            pending_indices: VecDeque::new(),
            terminal: Terminal::Active,
            terminal_flag: Arc::new(AtomicBool::new(false)),
            drained_emitted: false,
            aborted_emitted: false,
            token: token.into(),
            api_client,
            byte_source,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    /// Blocks this task until the next task-completion/failure
    /// arrives from in-flight uploads, dispatching it through the
    /// queue's state machine and returning the events it unlocked.
    ///
    /// Returns `None` once every sender has dropped (nothing left to
    /// await), which happens only after the queue has reached a
    /// terminal state and all spawned tasks have finished.
    pub async fn next_outcome_events(&mut self) -> Option<Vec<UploadEvent>> {
        let outcome = self.outcome_rx.recv().await?;
        Some(self.on_task_outcome(outcome))
    }

    /// `addChunkTask`: appends a `Pending` task for `chunk` and runs
    /// the scheduler. Silently rejected if the queue is terminal.
    pub fn add_chunk_task(&mut self, chunk: HashedChunk) -> Vec<UploadEvent> {
        if self.terminal != Terminal::Active {
            return Vec::new();
        }
        let index = chunk.index;
        self.tasks.push(UploadTask::pending(&chunk));
        self.stats.total_chunks += 1;
        self.stats.pending += 1;
        self.pending_indices.push_back(index);
        self.try_schedule()
    }

    /// `markAllChunksHashed`: enables the drain check.
    pub fn mark_all_chunks_hashed(&mut self) -> Vec<UploadEvent> {
        self.stats.all_chunks_hashed = true;
        self.try_drain_check()
    }

    /// `markAsCompleted`: forces terminal `Completed` (file-level
    /// dedup hit). All non-terminal tasks become `Completed`.
    pub fn mark_as_completed(&mut self) -> Vec<UploadEvent> {
        if self.terminal != Terminal::Active {
            return Vec::new();
        }
        self.terminal = Terminal::Completed;
        self.terminal_flag.store(true, Ordering::SeqCst);
        for task in &mut self.tasks {
            if !matches!(task.status, UploadTaskStatus::Completed | UploadTaskStatus::Failed) {
                task.status = UploadTaskStatus::Completed;
            }
        }
        self.stats.pending = 0;
        self.stats.in_flight = 0;
        self.stats.failed = 0;
        self.stats.completed = self.stats.total_chunks;
        self.stats.all_chunks_hashed = true;
        self.pending_indices.clear();
        self.try_drain_check()
    }

    /// `abort()`: external cancellation requested by the coordinator.
    pub fn abort(&mut self, error: UploadError) -> Vec<UploadEvent> {
        if self.terminal != Terminal::Active {
            return Vec::new();
        }
        self.terminal = Terminal::Aborted;
        self.terminal_flag.store(true, Ordering::SeqCst);
        self.pending_indices.clear();
        self.emit_aborted_once(error)
    }

    fn try_schedule(&mut self) -> Vec<UploadEvent> {
        while self.terminal == Terminal::Active && (self.stats.in_flight as usize) < self.concurrency {
            let Some(index) = self.pending_indices.pop_front() else { break };
            let task = &mut self.tasks[index as usize];
            task.status = UploadTaskStatus::InFlight;
            self.stats.pending -= 1;
            self.stats.in_flight += 1;

            let hash = task.hash.clone();
            let (start, end) = (task.start, task.end);
            let api_client = self.api_client.clone();
            let byte_source = self.byte_source.clone();
            let token = self.token.clone();
            let terminal_flag = self.terminal_flag.clone();
            let outcome_tx = self.outcome_tx.clone();

            tokio::spawn(async move {
                process_chunk(index, hash, start, end, token, api_client, byte_source, terminal_flag, outcome_tx).await;
            });
        }
        Vec::new()
    }

    fn on_task_outcome(&mut self, outcome: TaskOutcome) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        match outcome {
            TaskOutcome::Completed { index } => {
                let task = &mut self.tasks[index as usize];
                if task.status != UploadTaskStatus::InFlight {
                    return events; // already finalized by an abort in the meantime
                }
                task.status = UploadTaskStatus::Completed;
                self.stats.in_flight -= 1;
                self.stats.completed += 1;
                events.push(UploadEvent::ChunkUploaded { index });
                events.push(UploadEvent::UploadProgress {
                    completed: self.stats.completed,
                    total: self.stats.total_chunks,
                });
                events.extend(self.try_schedule());
                events.extend(self.try_drain_check());
            }
            TaskOutcome::Failed { index, error } => {
                let task = &mut self.tasks[index as usize];
                if task.status == UploadTaskStatus::InFlight {
                    task.status = UploadTaskStatus::Failed;
                    self.stats.in_flight -= 1;
                    self.stats.failed += 1;
                }
                if self.terminal == Terminal::Active {
                    self.terminal = Terminal::Aborted;
                    self.terminal_flag.store(true, Ordering::SeqCst);
                    self.pending_indices.clear();
                    events.extend(self.emit_aborted_once(error));
                }
            }
        }
        events
    }

    fn try_drain_check(&mut self) -> Vec<UploadEvent> {
        if !self.drained_emitted && self.stats.is_drained() {
            self.drained_emitted = true;
            vec![UploadEvent::QueueDrained]
        } else {
            Vec::new()
        }
    }

    fn emit_aborted_once(&mut self, error: UploadError) -> Vec<UploadEvent> {
        if self.aborted_emitted {
            Vec::new()
        } else {
            self.aborted_emitted = true;
            vec![UploadEvent::QueueAborted(error)]
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_chunk(
    index: u32,
    hash: String,
    start: u64,
    end: u64,
    token: String,
    api_client: Arc<dyn ApiClient>,
    byte_source: Arc<dyn ByteSource>,
    terminal_flag: Arc<AtomicBool>,
    outcome_tx: mpsc::Sender<TaskOutcome>,
) {
    use upload_engine_domain::CheckChunkRequest;

    if terminal_flag.load(Ordering::SeqCst) {
        return;
    }

    let probe = api_client
        .check_chunk(CheckChunkRequest {
            token: token.clone(),
            hash: hash.clone(),
            is_chunk: true,
        })
        .await;

    let exists = match probe {
        Ok(resp) => resp.exists,
        Err(error) => {
            let _ = outcome_tx.send(TaskOutcome::Failed { index, error }).await;
            return;
        }
    };

    if terminal_flag.load(Ordering::SeqCst) {
        return;
    }

    if !exists {
        let bytes = match byte_source.read_range(start, end).await {
            Ok(bytes) => bytes,
            Err(error) => {
                let _ = outcome_tx.send(TaskOutcome::Failed { index, error }).await;
                return;
            }
        };
        if let Err(error) = api_client.upload_chunk(&token, &hash, index, bytes).await {
            let _ = outcome_tx.send(TaskOutcome::Failed { index, error }).await;
            return;
        }
    }

    let _ = outcome_tx.send(TaskOutcome::Completed { index }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::byte_source::InMemoryByteSource;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use upload_engine_domain::{
        CheckChunkResponse, CheckFileRequest, CheckFileResponse, CreateSessionRequest, CreateSessionResponse, MergeFileRequest, MergeFileResponse,
        UploadChunkResponse,
    };

    struct FakeApiClient {
        dedup_hashes: HashSet<String>,
        fail_hashes: HashSet<String>,
        uploaded: StdMutex<Vec<u32>>,
    }

    impl FakeApiClient {
        fn new(dedup_hashes: &[&str], fail_hashes: &[&str]) -> Self {
            Self {
                dedup_hashes: dedup_hashes.iter().map(|s| s.to_string()).collect(),
                fail_hashes: fail_hashes.iter().map(|s| s.to_string()).collect(),
                uploaded: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ApiClient for FakeApiClient {
        async fn create_session(&self, _req: CreateSessionRequest) -> Result<CreateSessionResponse, UploadError> {
            unreachable!("not exercised by upload_queue tests")
        }

        async fn check_chunk(&self, req: upload_engine_domain::CheckChunkRequest) -> Result<CheckChunkResponse, UploadError> {
            Ok(CheckChunkResponse {
                code: 0,
                exists: self.dedup_hashes.contains(&req.hash),
            })
        }

        async fn check_file(&self, _req: CheckFileRequest) -> Result<CheckFileResponse, UploadError> {
            unreachable!("not exercised by upload_queue tests")
        }

        async fn upload_chunk(&self, _token: &str, hash: &str, index: u32, _chunk: Vec<u8>) -> Result<UploadChunkResponse, UploadError> {
            if self.fail_hashes.contains(hash) {
                return Err(UploadError::network("simulated upload failure"));
            }
            self.uploaded.lock().unwrap().push(index);
            Ok(UploadChunkResponse { code: 0, success: true })
        }

        async fn merge_file(&self, _req: MergeFileRequest) -> Result<MergeFileResponse, UploadError> {
            unreachable!("not exercised by upload_queue tests")
        }
    }

    fn chunk(index: u32, hash: &str) -> HashedChunk {
        HashedChunk {
            index,
            start: index as u64 * 10,
            end: index as u64 * 10 + 10,
            hash: hash.to_string(),
        }
    }

    async fn drain_to_completion(queue: &mut UploadQueue, mut events: Vec<UploadEvent>) -> Vec<UploadEvent> {
        loop {
            if queue.stats().is_drained() {
                return events;
            }
            match queue.next_outcome_events().await {
                Some(more) => events.extend(more),
                None => return events,
            }
        }
    }

    fn count_chunk_uploaded(events: &[UploadEvent]) -> usize {
        events.iter().filter(|e| matches!(e, UploadEvent::ChunkUploaded { .. })).count()
    }

    fn last_progress(events: &[UploadEvent]) -> Option<(u64, u64)> {
        events.iter().rev().find_map(|e| match e {
            UploadEvent::UploadProgress { completed, total } => Some((*completed, *total)),
            _ => None,
        })
    }

    #[tokio::test]
    async fn all_chunks_upload_and_queue_drains() {
        let api = Arc::new(FakeApiClient::new(&[], &[]));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![0u8; 30]));
        let mut queue = UploadQueue::new(2, "tok", api, byte_source);

        let mut events = Vec::new();
        for i in 0..3u32 {
            events.extend(queue.add_chunk_task(chunk(i, &format!("h{i}"))));
        }
        events.extend(queue.mark_all_chunks_hashed());

        let events = drain_to_completion(&mut queue, events).await;
        assert_eq!(count_chunk_uploaded(&events), 3);
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::UploadProgress { .. })).count(), 3);
        assert_eq!(last_progress(&events), Some((3, 3)));
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::QueueDrained)).count(), 1);
        assert!(queue.stats().is_consistent());
    }

    #[tokio::test]
    async fn deduped_chunk_completes_without_reupload() {
        let api = Arc::new(FakeApiClient::new(&["h0"], &[]));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![0u8; 10]));
        let mut queue = UploadQueue::new(1, "tok", api.clone(), byte_source);

        let mut events = queue.add_chunk_task(chunk(0, "h0"));
        events.extend(queue.mark_all_chunks_hashed());
        let events = drain_to_completion(&mut queue, events).await;

        assert_eq!(count_chunk_uploaded(&events), 1);
        assert!(api.uploaded.lock().unwrap().is_empty(), "deduped chunk must not call upload_chunk");
    }

    #[tokio::test]
    async fn failure_aborts_queue_exactly_once() {
        let api = Arc::new(FakeApiClient::new(&[], &["h1"]));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![0u8; 40]));
        let mut queue = UploadQueue::new(4, "tok", api, byte_source);

        let mut events = Vec::new();
        for i in 0..4u32 {
            events.extend(queue.add_chunk_task(chunk(i, &format!("h{i}"))));
        }
        events.extend(queue.mark_all_chunks_hashed());

        loop {
            if events.iter().any(|e| matches!(e, UploadEvent::QueueAborted(_))) {
                break;
            }
            match queue.next_outcome_events().await {
                Some(more) => events.extend(more),
                None => break,
            }
        }

        let aborted_count = events.iter().filter(|e| matches!(e, UploadEvent::QueueAborted(_))).count();
        assert_eq!(aborted_count, 1);
        assert_eq!(events.iter().filter(|e| matches!(e, UploadEvent::QueueDrained)).count(), 0);
    }

    #[tokio::test]
    async fn mark_as_completed_short_circuits_with_no_chunks() {
        let api = Arc::new(FakeApiClient::new(&[], &[]));
        let byte_source = Arc::new(InMemoryByteSource::new(vec![]));
        let mut queue = UploadQueue::new(2, "tok", api, byte_source);

        let events = queue.mark_as_completed();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], UploadEvent::QueueDrained));
    }
}
