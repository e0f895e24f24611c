// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The task-flow engine.
//!
//! ## Worker timeline
//!
//! One worker task owns every stage queue. It processes [`Command`]s strictly in order:
//! - `Submit`: dedup/bind against the live-task registry, or create and register a task
//!   and place it into the Initial stage.
//! - `Transition`: a promise was completed; move the task out of the stage that produced
//!   the verdict and into the verdict's next stages.
//!
//! Because admission, traversal and eviction all run on this one timeline, the holding set
//! of a task and the registry never disagree about whether a task is finished.
//!
//! ## Results
//!
//! A caller receives a [`TaskHandle`] that reads the task's delivered log, so callers bound
//! to a task after delivery still see the result. Every delivery is also broadcast on the
//! result bus that backs [`Engine::subscribe`] and [`Engine::observe`].

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::dispatch::StageQueue;
use super::replay::ReplayCursor;
use super::{Observer, Subscription, Task, TaskEvent, TaskRegistry, Verdict};
use crate::backends::headers::HeaderObserver;
use crate::errors::RpcError;
use crate::observability::messages::engine::{
    EngineStopped, StageMissing, SubscriptionLagged, TaskBound, TaskCreated, TaskFinished,
};
use crate::observability::messages::StructuredLog;
use crate::rpc::RequestDescriptor;
use crate::strategy::StageKind;
use crate::traits::{RequestCallback, TimeTracker};

/// Work item of the engine's worker timeline.
pub(crate) enum Command {
    Submit {
        descriptor: Arc<RequestDescriptor>,
        reply: oneshot::Sender<Arc<Task>>,
    },
    Transition {
        task: Arc<Task>,
        from: StageKind,
        verdict: Verdict,
    },
}

/// Handle to a running engine. Clones share the same engine; dropping the last clone stops
/// the worker.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    registry: Arc<TaskRegistry>,
    commands: mpsc::UnboundedSender<Command>,
    bus: broadcast::Sender<TaskEvent>,
    headers: HeaderObserver,
    shutdown: CancellationToken,
    runtime: Handle,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Everything the worker needs; built by [`EngineBuilder`](super::EngineBuilder).
pub(crate) struct EngineParts {
    pub stages: HashMap<StageKind, StageQueue>,
    pub commands: mpsc::UnboundedSender<Command>,
    pub receiver: mpsc::UnboundedReceiver<Command>,
    pub bus: broadcast::Sender<TaskEvent>,
    pub headers: HeaderObserver,
    pub time_tracker: Option<Arc<dyn TimeTracker>>,
    pub shutdown: CancellationToken,
}

impl Engine {
    /// Starts the worker on the current runtime.
    pub(crate) fn start(parts: EngineParts) -> Self {
        let registry = Arc::new(TaskRegistry::new());
        let worker = Worker {
            registry: registry.clone(),
            bus: parts.bus.clone(),
            stages: parts.stages,
            time_tracker: parts.time_tracker,
        };
        tokio::spawn(worker.run(parts.receiver, parts.shutdown.clone()));

        Self {
            inner: Arc::new(EngineInner {
                registry,
                commands: parts.commands,
                bus: parts.bus,
                headers: parts.headers,
                shutdown: parts.shutdown,
                runtime: Handle::current(),
            }),
        }
    }

    /// Fires the pipeline for `descriptor`, binding to an equivalent in-flight task when
    /// the descriptor is bindable.
    pub async fn execute_post(&self, descriptor: RequestDescriptor) -> Result<TaskHandle, RpcError> {
        let (reply, response) = oneshot::channel();
        self.inner
            .commands
            .send(Command::Submit {
                descriptor: Arc::new(descriptor),
                reply,
            })
            .map_err(|_| engine_stopped())?;
        let task = response.await.map_err(|_| engine_stopped())?;
        Ok(TaskHandle::new(task))
    }

    /// Fires the pipeline and waits for the terminal result.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Value, RpcError> {
        self.execute_post(descriptor).await?.result().await
    }

    /// Calls `callback` with every future terminal result of `method`.
    ///
    /// With `once` the subscription ends after the first result.
    pub fn subscribe(
        &self,
        method: &str,
        callback: Arc<dyn RequestCallback>,
        once: bool,
    ) -> Subscription {
        let token = self.inner.shutdown.child_token();
        let subscription = Subscription::new(token.clone());
        let mut receiver = self.inner.bus.subscribe();
        let method = method.to_string();

        self.inner.runtime.spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = receiver.recv() => event,
                };
                let event = match event {
                    Ok(event) if event.method == method => event,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        SubscriptionLagged {
                            method: &method,
                            skipped,
                        }
                        .log();
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                match event.verdict {
                    Verdict::Success { payload, .. } => callback.on_success(payload),
                    Verdict::Failure { error, .. } => callback.on_failure(error),
                    Verdict::Route { .. } => continue,
                }
                if once {
                    token.cancel();
                    break;
                }
            }
        });

        subscription
    }

    /// Stream of future successful results of `method`.
    pub fn observe(&self, method: &str) -> Observer {
        let subscription = Subscription::new(self.inner.shutdown.child_token());
        Observer::new(method.to_string(), self.inner.bus.subscribe(), subscription)
    }

    /// Registry of response-header listeners fed by the network stage.
    pub fn header_observer(&self) -> &HeaderObserver {
        &self.inner.headers
    }

    pub fn live_tasks(&self) -> usize {
        self.inner.registry.len()
    }

    /// Stops the worker and every stage loop. Callers still waiting on a task receive
    /// [`RpcError::InterruptFlowRequested`].
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("live_tasks", &self.live_tasks())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn engine_stopped() -> RpcError {
    RpcError::InterruptFlowRequested("engine stopped".to_string())
}

/// The caller's side of one submitted request.
pub struct TaskHandle {
    task: Arc<Task>,
    cursor: ReplayCursor<Verdict>,
}

impl TaskHandle {
    fn new(task: Arc<Task>) -> Self {
        let cursor = task.delivered();
        Self { task, cursor }
    }

    pub fn task_id(&self) -> u64 {
        self.task.id()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Waits for the delivered result: the payload on success, the carried error on failure.
    pub async fn result(mut self) -> Result<Value, RpcError> {
        match self.cursor.next().await {
            Some(verdict) => verdict.into_result(),
            None => Err(RpcError::InterruptFlowRequested(format!(
                "task {} finished without delivering a result",
                self.task.id()
            ))),
        }
    }
}

struct Worker {
    registry: Arc<TaskRegistry>,
    bus: broadcast::Sender<TaskEvent>,
    stages: HashMap<StageKind, StageQueue>,
    time_tracker: Option<Arc<dyn TimeTracker>>,
}

impl Worker {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        let live = self.registry.snapshot();
        for task in &live {
            task.close();
        }
        EngineStopped {
            live_tasks: live.len(),
        }
        .log();
    }

    fn handle(&self, command: Command) {
        match command {
            Command::Submit { descriptor, reply } => {
                let task = self.submit(descriptor);
                // The caller may have given up waiting; the task runs regardless.
                let _ = reply.send(task);
            }
            Command::Transition { task, from, verdict } => {
                self.place_to_queues(&task, Some(from), verdict.next());
            }
        }
    }

    fn submit(&self, descriptor: Arc<RequestDescriptor>) -> Arc<Task> {
        if descriptor.bindable {
            if let Some(task) = self
                .registry
                .find_bindable(&descriptor.method, &descriptor.cache_key)
            {
                TaskBound {
                    task_id: task.id(),
                    method: task.method(),
                    results_so_far: task.results_count(),
                }
                .log();
                return task;
            }
        }

        let task = Arc::new(Task::new(descriptor, self.bus.clone()));
        self.registry.register(task.clone());
        TaskCreated {
            task_id: task.id(),
            method: task.method(),
            strategy: task.descriptor().strategy.label(),
        }
        .log();
        self.place_to_queues(&task, None, &[StageKind::Initial]);
        task
    }

    fn place_to_queues(&self, task: &Arc<Task>, from: Option<StageKind>, next: &[StageKind]) {
        let finished = task.move_to(from, next);
        for stage in next {
            let queued = self
                .stages
                .get(stage)
                .map(|queue| queue.send(task.clone()).is_ok())
                .unwrap_or(false);
            if !queued {
                StageMissing {
                    stage: stage.as_str(),
                    task_id: task.id(),
                }
                .log();
                task.deliver(Verdict::Failure {
                    error: RpcError::InterruptFlowRequested(format!(
                        "no block accepts stage {}",
                        stage
                    )),
                    next: Vec::new(),
                });
                self.place_to_queues(task, Some(*stage), &[]);
            }
        }
        if finished {
            self.finish(task);
        }
    }

    fn finish(&self, task: &Arc<Task>) {
        self.registry.remove(task.id());
        task.close();
        let elapsed = task.elapsed();
        if let Some(tracker) = &self.time_tracker {
            tracker.on_task_finished(&task.descriptor().strategy, task.method(), elapsed);
        }
        TaskFinished {
            task_id: task.id(),
            method: task.method(),
            delivered: task.has_delivered(),
            elapsed,
        }
        .log();
    }
}
