// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the network stage.
//!
//! This module contains message types for logging events related to:
//! * Single and combined wire calls
//! * Tasks deferred to the next batch window
//! * Batch responses that cannot be matched to a request
//! * Batch response entries without an id

use crate::observability::messages::StructuredLog;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Why tasks were pushed back to the next batch window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The task uses a different transport than the majority of the window.
    Executor,
    /// Including the task would exceed some task's max batch size.
    BatchSize,
    /// The task's headers conflict with headers already merged into the batch.
    HeaderConflict,
}

impl DeferReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeferReason::Executor => "executor",
            DeferReason::BatchSize => "batch_size",
            DeferReason::HeaderConflict => "header_conflict",
        }
    }
}

/// A combined wire call was issued.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::network::BatchDispatched;
///
/// let msg = BatchDispatched {
///     methods: "user.get,user.list",
///     size: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BatchDispatched<'a> {
    pub methods: &'a str,
    pub size: usize,
}

impl Display for BatchDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dispatching batch of {} requests: {}", self.size, self.methods)
    }
}

impl StructuredLog for BatchDispatched<'_> {
    fn log(&self) {
        tracing::info!(methods = self.methods, size = self.size, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch",
            span_name = name,
            methods = self.methods,
            size = self.size,
        )
    }
}

/// A single, non-batched wire call was issued.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct SingleDispatched<'a> {
    pub task_id: u64,
    pub method: &'a str,
}

impl Display for SingleDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dispatching '{}' for task {}", self.method, self.task_id)
    }
}

impl StructuredLog for SingleDispatched<'_> {
    fn log(&self) {
        tracing::debug!(task_id = self.task_id, method = self.method, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "single",
            span_name = name,
            task_id = self.task_id,
            method = self.method,
        )
    }
}

/// Tasks were re-enqueued for the next window.
///
/// # Log Level
/// `debug!` - Scheduling detail
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::network::{DeferReason, TasksDeferred};
///
/// let msg = TasksDeferred {
///     reason: DeferReason::BatchSize,
///     count: 1,
/// };
///
/// assert_eq!(msg.to_string(), "Deferring 1 tasks to the next window (batch_size)");
/// ```
pub struct TasksDeferred {
    pub reason: DeferReason,
    pub count: usize,
}

impl Display for TasksDeferred {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Deferring {} tasks to the next window ({})",
            self.count,
            self.reason.as_str()
        )
    }
}

impl StructuredLog for TasksDeferred {
    fn log(&self) {
        tracing::debug!(reason = self.reason.as_str(), count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "deferred",
            span_name = name,
            reason = self.reason.as_str(),
            count = self.count,
        )
    }
}

/// A batch response entry carried an id that no request of the batch has.
///
/// # Log Level
/// `warn!` - Unexpected server behaviour
pub struct UnknownResponseId {
    pub id: u64,
}

impl Display for UnknownResponseId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Batch response carries unknown request id {}", self.id)
    }
}

impl StructuredLog for UnknownResponseId {
    fn log(&self) {
        tracing::warn!(id = self.id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unknown_response_id", span_name = name, id = self.id)
    }
}

/// A batch response entry had no numeric id and was skipped.
///
/// # Log Level
/// `warn!` - Unexpected server behaviour
pub struct BatchEntryWithoutId<'a> {
    pub entry: &'a Value,
}

impl Display for BatchEntryWithoutId<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Batch response entry carries no id: {}", self.entry)
    }
}

impl StructuredLog for BatchEntryWithoutId<'_> {
    fn log(&self) {
        tracing::warn!(entry = %self.entry, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "batch_entry_without_id",
            span_name = name,
            entry = %self.entry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_without_id_shows_the_entry() {
        let entry = json!({"result": 1});
        let msg = BatchEntryWithoutId { entry: &entry };
        assert_eq!(
            msg.to_string(),
            r#"Batch response entry carries no id: {"result":1}"#
        );
    }

    #[test]
    fn unknown_id_names_the_id() {
        let msg = UnknownResponseId { id: 42 };
        assert_eq!(msg.to_string(), "Batch response carries unknown request id 42");
    }
}
