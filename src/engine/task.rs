// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tasks, stage verdicts and the write-once promises stages report through.
//!
//! A [`Task`] is one logical in-flight request. It keeps:
//! - the set of stages currently holding it (a task is finished when the set is empty),
//! - an append-only log of every verdict stages produced (`results`),
//! - a durable log of the terminal result handed to subscribers (`delivered`).
//!
//! Stages never touch the routing directly. Each stage entry gets a [`Promise`]; the first
//! completion call on it records the verdict in the task's results and hands the verdict to
//! the engine's worker, which moves the task to the next stages.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use super::replay::{ReplayCursor, ReplayLog};
use super::Command;
use crate::errors::RpcError;
use crate::rpc::RequestDescriptor;
use crate::strategy::StageKind;

static TASK_IDS: AtomicU64 = AtomicU64::new(0);

/// Outcome of one stage execution for one task.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Routing only; carries no payload and never counts as the task's result.
    Route { next: Vec<StageKind> },
    Success {
        payload: Value,
        /// Serialized form of `payload`, as stored in the cache.
        raw: Option<String>,
        next: Vec<StageKind>,
    },
    Failure { error: RpcError, next: Vec<StageKind> },
}

impl Verdict {
    pub fn next(&self) -> &[StageKind] {
        match self {
            Verdict::Route { next } => next,
            Verdict::Success { next, .. } => next,
            Verdict::Failure { next, .. } => next,
        }
    }

    /// Routing-only verdicts are ancillary; successes and failures are not.
    pub fn is_ancillary(&self) -> bool {
        matches!(self, Verdict::Route { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Failure { .. })
    }

    /// Unwraps a terminal verdict into the caller-facing result.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self {
            Verdict::Success { payload, .. } => Ok(payload),
            Verdict::Failure { error, .. } => Err(error),
            Verdict::Route { .. } => Err(RpcError::InterruptFlowRequested(
                "routing verdict delivered as a result".into(),
            )),
        }
    }
}

/// Terminal verdict of a task, as broadcast on the engine's result bus.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    pub task_id: u64,
    pub method: String,
    pub cache_key: String,
    pub verdict: Verdict,
}

pub struct Task {
    id: u64,
    started: Instant,
    descriptor: Arc<RequestDescriptor>,
    holding: Mutex<Vec<StageKind>>,
    results: Arc<ReplayLog<Verdict>>,
    delivered: Arc<ReplayLog<Verdict>>,
    bus: broadcast::Sender<TaskEvent>,
}

impl Task {
    pub(crate) fn new(descriptor: Arc<RequestDescriptor>, bus: broadcast::Sender<TaskEvent>) -> Self {
        Self {
            id: TASK_IDS.fetch_add(1, Ordering::Relaxed) + 1,
            started: Instant::now(),
            descriptor,
            holding: Mutex::new(Vec::with_capacity(2)),
            results: Arc::new(ReplayLog::new()),
            delivered: Arc::new(ReplayLog::new()),
            bus,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn method(&self) -> &str {
        &self.descriptor.method
    }

    pub fn cache_key(&self) -> &str {
        &self.descriptor.cache_key
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True when the task serves `method` and, if given, the same canonical body.
    pub fn responds(&self, method: &str, cache_key: Option<&str>) -> bool {
        self.descriptor.method == method
            && cache_key.map_or(true, |key| self.descriptor.cache_key == key)
    }

    /// Number of verdicts recorded so far.
    pub fn results_count(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> Vec<Verdict> {
        self.results.snapshot()
    }

    pub fn last_success(&self) -> Option<Verdict> {
        self.results
            .last_matching(|v| !v.is_ancillary() && v.is_success())
    }

    pub fn last_error(&self) -> Option<Verdict> {
        self.results
            .last_matching(|v| !v.is_ancillary() && v.is_failure())
    }

    /// Pushes the terminal verdict to subscribers and onto the result bus.
    ///
    /// Only the first delivery of a task counts; later ones are dropped and `false` is
    /// returned.
    pub fn deliver(&self, verdict: Verdict) -> bool {
        if !self.delivered.push_once(verdict.clone()) {
            tracing::debug!(task_id = self.id, "Task already delivered; dropping verdict");
            return false;
        }
        // No receivers is fine: nobody asked for ad-hoc results of this method.
        let _ = self.bus.send(TaskEvent {
            task_id: self.id,
            method: self.descriptor.method.clone(),
            cache_key: self.descriptor.cache_key.clone(),
            verdict,
        });
        true
    }

    pub fn delivered(&self) -> ReplayCursor<Verdict> {
        self.delivered.cursor()
    }

    pub fn has_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }

    pub fn holding_stages(&self) -> Vec<StageKind> {
        self.lock_holding().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.results.is_completed()
    }

    /// Moves the task out of `from` and into every stage of `to`.
    ///
    /// Returns `true` when the holding set became empty; the results log is completed at
    /// that moment and the task is finished.
    pub(crate) fn move_to(&self, from: Option<StageKind>, to: &[StageKind]) -> bool {
        let mut holding = self.lock_holding();
        if let Some(from) = from {
            if let Some(position) = holding.iter().position(|s| *s == from) {
                holding.remove(position);
            }
        }
        holding.extend_from_slice(to);
        let finished = holding.is_empty();
        if finished {
            self.results.complete();
        }
        finished
    }

    /// Closes the delivered log; subscribers waiting on a task that never delivered end here.
    pub(crate) fn close(&self) {
        self.delivered.complete();
    }

    fn lock_holding(&self) -> std::sync::MutexGuard<'_, Vec<StageKind>> {
        self.holding.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("method", &self.descriptor.method)
            .field("holding", &self.holding_stages())
            .field("results", &self.results_count())
            .finish()
    }
}

/// Write-once verdict handle for one (task, stage entry).
///
/// Clones share the same cell: whichever completion call runs first wins and every later
/// call is ignored (and returns `false`).
#[derive(Clone)]
pub struct Promise {
    inner: Arc<PromiseInner>,
}

struct PromiseInner {
    task: Arc<Task>,
    stage: StageKind,
    completed: AtomicBool,
    sink: mpsc::UnboundedSender<Command>,
}

impl Promise {
    pub(crate) fn new(task: Arc<Task>, stage: StageKind, sink: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                task,
                stage,
                completed: AtomicBool::new(false),
                sink,
            }),
        }
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.inner.task
    }

    pub fn stage(&self) -> StageKind {
        self.inner.stage
    }

    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Success with a payload; routes along the strategy's success branch.
    pub fn set_result(&self, payload: Value, raw: Option<String>) -> bool {
        let next = self.resolve(true);
        self.dispatch(Verdict::Success { payload, raw, next })
    }

    /// Failure with an error; routes along the strategy's failure branch.
    pub fn set_error(&self, error: RpcError) -> bool {
        let next = self.resolve(false);
        self.dispatch(Verdict::Failure { error, next })
    }

    /// Routes along the chosen branch without producing a payload.
    pub fn next(&self, success: bool) -> bool {
        let next = self.resolve(success);
        self.dispatch(Verdict::Route { next })
    }

    /// Routes along the failure branch without producing a payload.
    pub fn pass(&self) -> bool {
        self.next(false)
    }

    /// Overrides the strategy: the task goes to `stage` next.
    pub fn set_next_index(&self, stage: StageKind) -> bool {
        self.set_next_indexes(vec![stage])
    }

    /// Overrides the strategy: the task goes to every stage of `next`.
    pub fn set_next_indexes(&self, next: Vec<StageKind>) -> bool {
        self.dispatch(Verdict::Route { next })
    }

    fn resolve(&self, success: bool) -> Vec<StageKind> {
        self.inner
            .task
            .descriptor
            .strategy
            .next(self.inner.stage, success)
    }

    fn dispatch(&self, verdict: Verdict) -> bool {
        if self.inner.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.task.results.push(verdict.clone());
        let command = Command::Transition {
            task: self.inner.task.clone(),
            from: self.inner.stage,
            verdict,
        };
        if self.inner.sink.send(command).is_err() {
            tracing::debug!(
                task_id = self.inner.task.id,
                stage = %self.inner.stage,
                "Engine worker is gone, verdict dropped"
            );
        }
        true
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("task_id", &self.inner.task.id)
            .field("stage", &self.inner.stage)
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::json::JsonSerializer;
    use crate::backends::stub::EchoTransport;
    use crate::rpc::RpcRequest;
    use crate::strategy::{InvocationStrategy, MergedStrategy};
    use serde_json::json;
    use StageKind::*;

    fn task() -> (Arc<Task>, mpsc::UnboundedReceiver<Command>, mpsc::UnboundedSender<Command>) {
        let descriptor = RequestDescriptor::builder(
            RpcRequest::new("test.method"),
            Arc::new(EchoTransport::default()),
        )
        .strategy(Arc::new(MergedStrategy::merge([InvocationStrategy::PriorityCache])))
        .build(&JsonSerializer)
        .unwrap();
        let (bus, _) = broadcast::channel(8);
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Task::new(Arc::new(descriptor), bus)), rx, tx)
    }

    #[test]
    fn finished_when_holding_set_empties() {
        let (task, _rx, _tx) = task();
        assert!(!task.move_to(None, &[Initial]));
        assert!(!task.move_to(Some(Initial), &[DeliverResult, SaveToCache]));
        assert!(!task.move_to(Some(SaveToCache), &[]));
        assert!(!task.is_finished());
        assert!(task.move_to(Some(DeliverResult), &[]));
        assert!(task.is_finished());
    }

    #[test]
    fn promise_is_write_once_and_follows_strategy() {
        let (task, mut rx, tx) = task();
        let promise = Promise::new(task.clone(), GetFromCache, tx);

        assert!(promise.pass());
        assert!(!promise.set_result(json!("late"), None));
        assert!(promise.is_completed());

        match rx.try_recv().unwrap() {
            Command::Transition { from, verdict, .. } => {
                assert_eq!(from, GetFromCache);
                assert_eq!(verdict.next(), &[GetFromNet]);
                assert!(verdict.is_ancillary());
            }
            _ => panic!("expected a transition"),
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(task.results_count(), 1);
    }

    #[test]
    fn last_success_skips_ancillary_verdicts() {
        let (task, _rx, tx) = task();
        Promise::new(task.clone(), GetFromNet, tx.clone()).set_result(json!(1), Some("1".into()));
        Promise::new(task.clone(), SaveToCache, tx.clone()).next(true);
        Promise::new(task.clone(), GetFromNet, tx).set_error(RpcError::validation("bad"));

        match task.last_success() {
            Some(Verdict::Success { payload, .. }) => assert_eq!(payload, json!(1)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(task.last_error().is_some());
        assert_eq!(task.results_count(), 3);
    }

    #[tokio::test]
    async fn delivered_result_is_replayed_to_late_subscribers() {
        let (task, _rx, _tx) = task();
        task.deliver(Verdict::Success {
            payload: json!("ok"),
            raw: None,
            next: vec![],
        });
        task.close();

        let mut first = task.delivered();
        let mut second = task.delivered();
        assert_eq!(first.next().await.unwrap().into_result().unwrap(), json!("ok"));
        assert_eq!(second.next().await.unwrap().into_result().unwrap(), json!("ok"));
        assert!(first.next().await.is_none());
    }

    #[tokio::test]
    async fn second_delivery_is_dropped() {
        let (task, _rx, _tx) = task();
        let mut events = task.bus.subscribe();

        assert!(task.deliver(Verdict::Success {
            payload: json!("first"),
            raw: None,
            next: vec![],
        }));
        assert!(!task.deliver(Verdict::Failure {
            error: RpcError::InterruptFlowRequested("late".into()),
            next: vec![],
        }));
        task.close();

        let event = events.try_recv().unwrap();
        assert!(event.verdict.is_success());
        assert!(events.try_recv().is_err());

        let mut cursor = task.delivered();
        assert_eq!(cursor.next().await.unwrap().into_result().unwrap(), json!("first"));
        assert!(cursor.next().await.is_none());
    }
}
