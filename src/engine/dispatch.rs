// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-stage input queues and the two dispatch disciplines.
//!
//! Each stage gets one loop that owns its input queue. Immediate stages hand every arriving
//! task to the block right away; time-threshold stages open a window on the first arrival
//! and hand everything collected in the window to the block at once.
//!
//! Block bodies never run on the loop itself. They are spawned on the IO runtime handle and
//! supervised: an `Err` from the block or a panic inside it completes every promise the
//! block left open with a failure, so a broken block can never strand a task.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use super::{Command, Promise, Task};
use crate::errors::RpcError;
use crate::observability::messages::engine::{StageHandlerFailed, StagePanicked};
use crate::observability::messages::StructuredLog;
use crate::traits::{InvocationBlock, QueueAlgorithm};

/// Input side of one stage loop.
pub(crate) type StageQueue = mpsc::UnboundedSender<Arc<Task>>;

pub(crate) struct StageRunner {
    block: Arc<dyn InvocationBlock>,
    sink: mpsc::UnboundedSender<Command>,
    io: Handle,
}

impl StageRunner {
    pub(crate) fn new(
        block: Arc<dyn InvocationBlock>,
        sink: mpsc::UnboundedSender<Command>,
        io: Handle,
    ) -> Self {
        Self { block, sink, io }
    }

    /// Starts the stage loop on the current runtime and returns its queue.
    pub(crate) fn spawn(self, shutdown: CancellationToken) -> StageQueue {
        let (queue, receiver) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            match self.block.queue_algorithm() {
                QueueAlgorithm::Immediate => self.run_immediate(receiver, shutdown).await,
                QueueAlgorithm::TimeThreshold => self.run_windowed(receiver, shutdown).await,
            }
        });
        queue
    }

    async fn run_immediate(
        self,
        mut receiver: mpsc::UnboundedReceiver<Arc<Task>>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                task = receiver.recv() => match task {
                    Some(task) => {
                        let promise = self.promise(task);
                        self.run_guarded(vec![promise], false);
                    }
                    None => break,
                },
            }
        }
    }

    async fn run_windowed(
        self,
        mut receiver: mpsc::UnboundedReceiver<Arc<Task>>,
        shutdown: CancellationToken,
    ) {
        let window = self.block.queue_time_threshold();
        loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                task = receiver.recv() => match task {
                    Some(task) => task,
                    None => return,
                },
            };

            let mut buffer = vec![first];
            let deadline = tokio::time::sleep(window);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return,
                    _ = &mut deadline => break,
                    task = receiver.recv() => match task {
                        Some(task) => buffer.push(task),
                        None => break,
                    },
                }
            }

            let promises = buffer.into_iter().map(|task| self.promise(task)).collect();
            self.run_guarded(promises, true);
        }
    }

    fn promise(&self, task: Arc<Task>) -> Promise {
        Promise::new(task, self.block.stage(), self.sink.clone())
    }

    /// Runs the block on the IO runtime and fails whatever it leaves open on error or panic.
    fn run_guarded(&self, promises: Vec<Promise>, batched: bool) {
        let block = self.block.clone();
        let handed = promises.clone();
        let handler = self.io.spawn(async move {
            if batched {
                block.on_queue_consumed(handed).await
            } else {
                match handed.into_iter().next() {
                    Some(promise) => block.on_entity(promise).await,
                    None => Ok(()),
                }
            }
        });

        let stage = self.block.stage();
        self.io.spawn(async move {
            let error = match handler.await {
                Ok(Ok(())) => return,
                Ok(Err(error)) => {
                    StageHandlerFailed {
                        stage: stage.as_str(),
                        task_count: promises.len(),
                        error: &error,
                    }
                    .log();
                    error
                }
                Err(join_error) => {
                    let message = panic_message(join_error);
                    StagePanicked {
                        stage: stage.as_str(),
                        task_count: promises.len(),
                        message: &message,
                    }
                    .log();
                    RpcError::unknown_external(message)
                }
            };
            for promise in promises.iter().filter(|p| !p.is_completed()) {
                promise.set_error(error.clone());
            }
        });
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = match error.try_into_panic() {
        Ok(payload) => payload,
        Err(_) => return "stage handler was cancelled".to_string(),
    };
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage handler panicked".to_string()
    }
}
