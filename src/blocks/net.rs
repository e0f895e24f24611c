// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The network stage and its batching scheduler.
//!
//! The stage collects tasks for one time window and then decides, for everything in the
//! window, what goes on the wire now and what waits for the next window:
//!
//! 1. A window holding a single task is sent as a single call.
//! 2. Tasks are grouped by transport instance. The largest group (earliest on ties) stays;
//!    the rest is deferred. A group of one is sent as a single call.
//! 3. Tasks are walked in arrival order. A task joins the batch while the batch is below
//!    the running cap and below the task's own max batch size; joining lowers the cap to
//!    that max batch size. Everything else is deferred.
//! 4. The batch is trimmed to the first task's max batch size. A batch of one is sent as a
//!    single call.
//! 5. Request headers are merged in arrival order. A task whose headers disagree with the
//!    merged set is deferred.
//! 6. The remaining bodies are sent as one JSON array and the response array is matched
//!    back to the tasks by protocol id.
//!
//! Deferring a task routes it back into this stage, so it lands in the next window.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::headers::HeaderObserver;
use crate::config::consts::{APPLICATION_METHOD_QUERY, DEFAULT_QUEUE_TIME_THRESHOLD};
use crate::engine::Promise;
use crate::errors::RpcError;
use crate::observability::messages::network::{
    BatchDispatched, BatchEntryWithoutId, DeferReason, SingleDispatched, TasksDeferred,
    UnknownResponseId,
};
use crate::observability::messages::StructuredLog;
use crate::rpc::{same_instance, HttpMethod, RequestDescriptor, ResultType};
use crate::strategy::StageKind;
use crate::traits::{
    EnvelopeError, InvocationBlock, QueueAlgorithm, Serializer, Transport, Validator,
};

pub struct GetFromNetBlock {
    serializer: Arc<dyn Serializer>,
    validator: Arc<dyn Validator>,
    headers: HeaderObserver,
    window: Duration,
}

impl GetFromNetBlock {
    pub fn new(
        serializer: Arc<dyn Serializer>,
        validator: Arc<dyn Validator>,
        headers: HeaderObserver,
    ) -> Self {
        Self {
            serializer,
            validator,
            headers,
            window: DEFAULT_QUEUE_TIME_THRESHOLD,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    async fn execute_single(&self, promise: Promise) {
        let descriptor = promise.task().descriptor();
        SingleDispatched {
            task_id: promise.task().id(),
            method: &descriptor.method,
        }
        .log();

        let response = match descriptor.http_method {
            HttpMethod::Get => {
                descriptor
                    .transport
                    .execute_get(&descriptor.headers, &descriptor.query)
                    .await
            }
            HttpMethod::Post => {
                descriptor
                    .transport
                    .execute_post(&descriptor.flat_request, &descriptor.headers, &descriptor.query)
                    .await
            }
        };

        match response {
            Ok(response) => {
                self.headers.propagate(&descriptor.method, &response.headers);
                match self.serializer.deserialize(Some(&response.body), &ResultType::any()) {
                    Ok(envelope) => self.complete(&promise, &envelope),
                    Err(error) => {
                        promise.set_error(error);
                    }
                }
            }
            Err(error) => {
                promise.set_error(error.into());
            }
        }
    }

    async fn execute_batch(&self, promises: Vec<Promise>) {
        let (group, other_executors) = split_by_executor(promises);
        defer(other_executors, DeferReason::Executor);
        if group.len() == 1 {
            return self.execute_many_singly(group).await;
        }

        let (batch, oversized) = fit_batch_size(group);
        defer(oversized, DeferReason::BatchSize);
        if batch.len() == 1 {
            return self.execute_many_singly(batch).await;
        }

        let (batch, headers, conflicting) = merge_headers(batch);
        defer(conflicting, DeferReason::HeaderConflict);
        if batch.len() == 1 {
            return self.execute_many_singly(batch).await;
        }

        self.execute_combined(batch, headers).await;
    }

    async fn execute_many_singly(&self, promises: Vec<Promise>) {
        for promise in promises {
            self.execute_single(promise).await;
        }
    }

    async fn execute_combined(&self, batch: Vec<Promise>, headers: HashMap<String, String>) {
        let methods = batch
            .iter()
            .map(|p| p.task().method())
            .collect::<Vec<_>>()
            .join(",");
        let body = format!(
            "[{}]",
            batch
                .iter()
                .map(|p| p.task().descriptor().flat_request.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        let query = HashMap::from([(APPLICATION_METHOD_QUERY.to_string(), methods.clone())]);
        let transport: Arc<dyn Transport> = batch[0].task().descriptor().transport.clone();

        BatchDispatched {
            methods: &methods,
            size: batch.len(),
        }
        .log();

        let response = match transport.execute_post(&body, &headers, &query).await {
            Ok(response) => response,
            Err(error) => {
                let error: RpcError = error.into();
                for promise in &batch {
                    promise.set_error(error.clone());
                }
                return;
            }
        };

        for promise in &batch {
            self.headers.propagate(promise.task().method(), &response.headers);
        }

        let entries = match self
            .serializer
            .deserialize(Some(&response.body), &ResultType::of::<Vec<Value>>())
        {
            Ok(Value::Array(entries)) => entries,
            Ok(other) => {
                let error = RpcError::conversion(format!("batch response is not an array: {}", other));
                for promise in &batch {
                    promise.set_error(error.clone());
                }
                return;
            }
            Err(error) => {
                for promise in &batch {
                    promise.set_error(error.clone());
                }
                return;
            }
        };

        let mut by_id: HashMap<u64, Value> = HashMap::with_capacity(entries.len());
        for entry in entries {
            match entry.get("id").and_then(Value::as_u64) {
                Some(id) => {
                    by_id.insert(id, entry);
                }
                None => BatchEntryWithoutId { entry: &entry }.log(),
            }
        }

        for promise in &batch {
            match by_id.remove(&promise.task().descriptor().body.id) {
                Some(entry) => self.complete(promise, &entry),
                None => {
                    promise.set_error(RpcError::conversion(
                        "responses ids not comparable with requests ids",
                    ));
                }
            }
        }
        for id in by_id.keys() {
            UnknownResponseId { id: *id }.log();
        }
    }

    /// Unwraps, deserializes and validates one response envelope into the promise.
    fn complete(&self, promise: &Promise, envelope: &Value) {
        match self.convert(promise.task().descriptor(), envelope) {
            Ok((payload, raw)) => promise.set_result(payload, raw),
            Err(error) => promise.set_error(error),
        };
    }

    fn convert(
        &self,
        descriptor: &RequestDescriptor,
        envelope: &Value,
    ) -> Result<(Value, Option<String>), RpcError> {
        let raw = match descriptor.conversion.check_error_or_result(envelope) {
            Ok(raw) => raw,
            Err(EnvelopeError::Declared(error)) => {
                let error = serde_json::from_str(&error).unwrap_or(Value::String(error));
                return Err(RpcError::ResponseError { error });
            }
            Err(EnvelopeError::Malformed(message)) => return Err(RpcError::conversion(message)),
        };
        let payload = self
            .serializer
            .deserialize(raw.as_deref(), &descriptor.result_type)?;
        self.validator.validate(&payload)?;
        Ok((payload, raw))
    }
}

#[async_trait]
impl InvocationBlock for GetFromNetBlock {
    fn stage(&self) -> StageKind {
        StageKind::GetFromNet
    }

    fn queue_algorithm(&self) -> QueueAlgorithm {
        QueueAlgorithm::TimeThreshold
    }

    fn queue_time_threshold(&self) -> Duration {
        self.window
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        self.execute_single(promise).await;
        Ok(())
    }

    async fn on_queue_consumed(&self, promises: Vec<Promise>) -> Result<(), RpcError> {
        if promises.len() == 1 {
            self.execute_many_singly(promises).await;
        } else {
            self.execute_batch(promises).await;
        }
        Ok(())
    }
}

fn defer(promises: Vec<Promise>, reason: DeferReason) {
    if promises.is_empty() {
        return;
    }
    TasksDeferred {
        reason,
        count: promises.len(),
    }
    .log();
    for promise in promises {
        promise.set_next_index(StageKind::GetFromNet);
    }
}

/// Keeps the largest same-transport group (earliest on ties); returns `(kept, deferred)`.
fn split_by_executor(promises: Vec<Promise>) -> (Vec<Promise>, Vec<Promise>) {
    let mut groups: Vec<Vec<Promise>> = Vec::new();
    for promise in promises {
        let transport = &promise.task().descriptor().transport;
        match groups
            .iter_mut()
            .find(|g| same_instance(&g[0].task().descriptor().transport, transport))
        {
            Some(group) => group.push(promise),
            None => groups.push(vec![promise]),
        }
    }

    if groups.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut majority = 0;
    for (index, group) in groups.iter().enumerate() {
        if group.len() > groups[majority].len() {
            majority = index;
        }
    }
    let kept = groups.remove(majority);
    (kept, groups.into_iter().flatten().collect())
}

/// Walks the group in arrival order honouring every included task's max batch size.
fn fit_batch_size(group: Vec<Promise>) -> (Vec<Promise>, Vec<Promise>) {
    let mut cap = usize::MAX;
    let mut batch = Vec::new();
    let mut deferred = Vec::new();
    for promise in group {
        let max = promise.task().descriptor().max_batch_size;
        if batch.len() < cap && max > batch.len() {
            cap = cap.min(max);
            batch.push(promise);
        } else {
            deferred.push(promise);
        }
    }

    if let Some(limit) = batch.first().map(|p| p.task().descriptor().max_batch_size) {
        if batch.len() > limit {
            deferred.extend(batch.split_off(limit));
        }
    }
    (batch, deferred)
}

/// Merges headers in arrival order; returns `(batch, merged headers, conflicting)`.
fn merge_headers(batch: Vec<Promise>) -> (Vec<Promise>, HashMap<String, String>, Vec<Promise>) {
    let mut merged: HashMap<String, String> = HashMap::new();
    let mut kept = Vec::with_capacity(batch.len());
    let mut conflicting = Vec::new();
    for promise in batch {
        let headers = &promise.task().descriptor().headers;
        let conflict = headers
            .iter()
            .any(|(name, value)| merged.get(name).map_or(false, |m| m != value));
        if conflict {
            conflicting.push(promise);
        } else {
            merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
            kept.push(promise);
        }
    }
    (kept, merged, conflicting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::json::JsonSerializer;
    use crate::backends::stub::EchoTransport;
    use crate::engine::{Command, Task};
    use crate::rpc::RpcRequest;
    use serde_json::json;
    use tokio::sync::{broadcast, mpsc};

    struct Fixture {
        sink: mpsc::UnboundedSender<Command>,
        _commands: mpsc::UnboundedReceiver<Command>,
        bus: broadcast::Sender<crate::engine::TaskEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let (sink, commands) = mpsc::unbounded_channel();
            let (bus, _) = broadcast::channel(8);
            Self {
                sink,
                _commands: commands,
                bus,
            }
        }

        fn promise(
            &self,
            transport: &Arc<dyn Transport>,
            max_batch_size: usize,
            headers: &[(&str, &str)],
        ) -> Promise {
            let mut body = RpcRequest::new("m");
            body.add_parameter("p", json!(1)).unwrap();
            let descriptor = RequestDescriptor::builder(body, transport.clone())
                .max_batch_size(max_batch_size)
                .headers(
                    headers
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )
                .build(&JsonSerializer)
                .unwrap();
            let task = Arc::new(Task::new(Arc::new(descriptor), self.bus.clone()));
            Promise::new(task, StageKind::GetFromNet, self.sink.clone())
        }
    }

    fn ids(promises: &[Promise]) -> Vec<u64> {
        promises.iter().map(|p| p.task().id()).collect()
    }

    #[test]
    fn walk_respects_every_included_max() {
        let fixture = Fixture::new();
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport::new());
        let first = fixture.promise(&transport, 5, &[]);
        let no_batch = fixture.promise(&transport, 1, &[]);
        let second = fixture.promise(&transport, 5, &[]);
        let expected = ids(&[first.clone(), second.clone()]);
        let deferred_id = no_batch.task().id();

        let (batch, deferred) = fit_batch_size(vec![first, no_batch, second]);
        assert_eq!(ids(&batch), expected);
        assert_eq!(ids(&deferred), vec![deferred_id]);
    }

    #[test]
    fn walk_caps_at_smallest_max_seen() {
        let fixture = Fixture::new();
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport::new());
        let group: Vec<Promise> = [5, 2, 5, 5]
            .iter()
            .map(|max| fixture.promise(&transport, *max, &[]))
            .collect();

        let (batch, deferred) = fit_batch_size(group);
        assert_eq!(batch.len(), 2);
        assert_eq!(deferred.len(), 2);
    }

    #[test]
    fn majority_transport_wins_ties_to_earliest() {
        let fixture = Fixture::new();
        let a: Arc<dyn Transport> = Arc::new(EchoTransport::new());
        let b: Arc<dyn Transport> = Arc::new(EchoTransport::new());
        let promises = vec![
            fixture.promise(&b, 5, &[]),
            fixture.promise(&a, 5, &[]),
            fixture.promise(&a, 5, &[]),
        ];
        let (kept, deferred) = split_by_executor(promises.clone());
        assert_eq!(ids(&kept), ids(&promises[1..]));
        assert_eq!(ids(&deferred), ids(&promises[..1]));

        let tie = vec![fixture.promise(&b, 5, &[]), fixture.promise(&a, 5, &[])];
        let (kept, _) = split_by_executor(tie.clone());
        assert_eq!(ids(&kept), ids(&tie[..1]));
    }

    #[test]
    fn later_conflicting_headers_are_pulled_out() {
        let fixture = Fixture::new();
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport::new());
        let promises = vec![
            fixture.promise(&transport, 5, &[("x-auth", "a"), ("x-lang", "en")]),
            fixture.promise(&transport, 5, &[("x-auth", "b")]),
            fixture.promise(&transport, 5, &[("x-trace", "1")]),
        ];

        let (kept, merged, conflicting) = merge_headers(promises.clone());
        assert_eq!(ids(&kept), vec![promises[0].task().id(), promises[2].task().id()]);
        assert_eq!(ids(&conflicting), vec![promises[1].task().id()]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("x-auth").map(String::as_str), Some("a"));
    }
}
