// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Pool (C3)
//!
//! A fixed-size set of parallel hash executors. Workers run as `tokio`
//! tasks and communicate with the driver loop purely by message
//! passing — they own no state shared with the coordinator. Hashing is
//! CPU-bound, so each worker performs it inside `spawn_blocking`.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use upload_engine_domain::{ByteSource, HashResult, HashService, HashTask, UploadError, WorkerCount};

use crate::task_queue::TaskQueue;

/// Events the pool reports to its driver's caller.
#[derive(Debug)]
pub enum WorkerPoolEvent {
    Result(HashResult),
    /// A worker reported an error, or the pool's runtime errored out.
    /// The pool terminates all workers after this.
    Aborted(UploadError),
    /// Queue empty, no task in flight, all workers idle.
    Completed,
    /// `terminate()` was called before natural completion.
    Terminated,
}

struct WorkerMsg {
    worker_id: usize,
    outcome: Result<HashResult, UploadError>,
}

/// The Worker Pool component. Consumes `self`: one pool per upload.
pub struct WorkerPool {
    worker_count: WorkerCount,
    hash_service: Arc<dyn HashService>,
    byte_source: Arc<dyn ByteSource>,
}

impl WorkerPool {
    pub fn new(worker_count: WorkerCount, hash_service: Arc<dyn HashService>, byte_source: Arc<dyn ByteSource>) -> Self {
        Self {
            worker_count,
            hash_service,
            byte_source,
        }
    }

    /// Runs the pool to completion against `queue`, returning a
    /// channel of `WorkerPoolEvent`s. The channel closes after exactly
    /// one of `Completed`, `Aborted`, or `Terminated` is sent.
    pub fn run(self, mut queue: TaskQueue, cancellation: CancellationToken) -> mpsc::Receiver<WorkerPoolEvent> {
        let (out_tx, out_rx) = mpsc::channel(32);
        let (result_tx, mut result_rx) = mpsc::channel::<WorkerMsg>(32);

        let n = self.worker_count.get();
        let mut worker_inputs = Vec::with_capacity(n);
        for worker_id in 0..n {
            let (in_tx, mut in_rx) = mpsc::channel::<HashTask>(1);
            worker_inputs.push(in_tx);

            let hash_service = self.hash_service.clone();
            let byte_source = self.byte_source.clone();
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                while let Some(task) = in_rx.recv().await {
                    let outcome = hash_one(byte_source.clone(), hash_service.clone(), task).await;
                    if result_tx.send(WorkerMsg { worker_id, outcome }).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        tokio::spawn(async move {
            let mut idle: Vec<usize> = (0..n).collect();
            let mut active = 0usize;

            let assign = |queue: &mut TaskQueue, idle: &mut Vec<usize>, active: &mut usize, worker_inputs: &[mpsc::Sender<HashTask>]| {
                while let Some(worker_id) = idle.pop() {
                    match queue.dequeue() {
                        Some(task) => {
                            *active += 1;
                            if worker_inputs[worker_id].try_send(task).is_err() {
                                // Worker channel closed (pool shutting down); stop assigning.
                                break;
                            }
                        }
                        None => {
                            idle.push(worker_id);
                            break;
                        }
                    }
                }
            };

            assign(&mut queue, &mut idle, &mut active, &worker_inputs);
            if queue.is_empty() && active == 0 {
                let _ = out_tx.send(WorkerPoolEvent::Completed).await;
                return;
            }

            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => {
                        worker_inputs.clear();
                        let _ = out_tx.send(WorkerPoolEvent::Terminated).await;
                        return;
                    }
                    msg = result_rx.recv() => {
                        let Some(msg) = msg else { return };
                        active -= 1;
                        match msg.outcome {
                            Ok(result) => {
                                if out_tx.send(WorkerPoolEvent::Result(result)).await.is_err() {
                                    return;
                                }
                                idle.push(msg.worker_id);
                                assign(&mut queue, &mut idle, &mut active, &worker_inputs);
                                if queue.is_empty() && active == 0 && idle.len() == n {
                                    let _ = out_tx.send(WorkerPoolEvent::Completed).await;
                                    return;
                                }
                            }
                            Err(err) => {
                                let _ = out_tx.send(WorkerPoolEvent::Aborted(err)).await;
                                return;
                            }
                        }
                    }
                }
            }
        });

        out_rx
    }
}

async fn hash_one(byte_source: Arc<dyn ByteSource>, hash_service: Arc<dyn HashService>, task: HashTask) -> Result<HashResult, UploadError> {
    let bytes = byte_source.read_range(task.range.start, task.range.end).await?;
    let hash = tokio::task::spawn_blocking(move || hash_service.digest(&bytes))
        .await
        .map_err(|e| UploadError::worker(format!("hash task panicked: {e}")))?;
    Ok(HashResult {
        index: task.index,
        hash,
        range: task.range,
    })
}
