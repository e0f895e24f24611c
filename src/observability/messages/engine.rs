// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the task lifecycle.
//!
//! This module contains message types for logging events related to:
//! * Task creation and binding to an in-flight task
//! * Task completion and latency
//! * Stage handlers that failed or panicked
//! * Subscribers lagging behind the result bus
//! * Engine shutdown

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A new task was registered and entered the Initial stage.
///
/// # Log Level
/// `debug!` - Per-request detail
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::engine::TaskCreated;
///
/// let msg = TaskCreated {
///     task_id: 1,
///     method: "user.get",
///     strategy: "priority_cache",
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct TaskCreated<'a> {
    pub task_id: u64,
    pub method: &'a str,
    pub strategy: &'a str,
}

impl Display for TaskCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} created for '{}' with strategy {}",
            self.task_id, self.method, self.strategy
        )
    }
}

impl StructuredLog for TaskCreated<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            method = self.method,
            strategy = self.strategy,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task",
            span_name = name,
            task_id = self.task_id,
            method = self.method,
            strategy = self.strategy,
        )
    }
}

/// A caller was attached to an equivalent in-flight task instead of creating one.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct TaskBound<'a> {
    pub task_id: u64,
    pub method: &'a str,
    pub results_so_far: usize,
}

impl Display for TaskBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Bound request '{}' to in-flight task {} ({} verdicts so far)",
            self.method, self.task_id, self.results_so_far
        )
    }
}

impl StructuredLog for TaskBound<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            method = self.method,
            results_so_far = self.results_so_far,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task_bound",
            span_name = name,
            task_id = self.task_id,
            method = self.method,
        )
    }
}

/// A task left its last stage and was evicted from the registry.
///
/// # Log Level
/// `debug!` - Per-request detail
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::engine::TaskFinished;
/// use std::time::Duration;
///
/// let msg = TaskFinished {
///     task_id: 3,
///     method: "user.get",
///     delivered: true,
///     elapsed: Duration::from_millis(120),
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct TaskFinished<'a> {
    pub task_id: u64,
    pub method: &'a str,
    pub delivered: bool,
    pub elapsed: Duration,
}

impl Display for TaskFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.delivered {
            write!(
                f,
                "Task {} for '{}' finished in {:?}",
                self.task_id, self.method, self.elapsed
            )
        } else {
            write!(
                f,
                "Task {} for '{}' finished in {:?} without delivering a result",
                self.task_id, self.method, self.elapsed
            )
        }
    }
}

impl StructuredLog for TaskFinished<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            method = self.method,
            delivered = self.delivered,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task_finished",
            span_name = name,
            task_id = self.task_id,
            method = self.method,
            elapsed = ?self.elapsed,
        )
    }
}

/// A stage handler returned an error; its open promises were failed with it.
///
/// # Log Level
/// `warn!` - Recovered failure
pub struct StageHandlerFailed<'a> {
    pub stage: &'a str,
    pub task_count: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for StageHandlerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage {} handler failed for {} tasks: {}",
            self.stage, self.task_count, self.error
        )
    }
}

impl StructuredLog for StageHandlerFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            task_count = self.task_count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stage_failed",
            span_name = name,
            stage = self.stage,
            task_count = self.task_count,
        )
    }
}

/// A stage handler panicked; its open promises became unknown external errors.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::engine::StagePanicked;
///
/// let msg = StagePanicked {
///     stage: "get_from_net",
///     task_count: 2,
///     message: "index out of bounds",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct StagePanicked<'a> {
    pub stage: &'a str,
    pub task_count: usize,
    pub message: &'a str,
}

impl Display for StagePanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage {} panicked while handling {} tasks: {}",
            self.stage, self.task_count, self.message
        )
    }
}

impl StructuredLog for StagePanicked<'_> {
    fn log(&self) {
        tracing::error!(
            stage = self.stage,
            task_count = self.task_count,
            panic = self.message,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stage_panicked",
            span_name = name,
            stage = self.stage,
            task_count = self.task_count,
        )
    }
}

/// A task was routed to a stage that has no block registered.
///
/// # Log Level
/// `error!` - Misconfigured engine
pub struct StageMissing<'a> {
    pub stage: &'a str,
    pub task_id: u64,
}

impl Display for StageMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No block registered for stage {}, task {} interrupted",
            self.stage, self.task_id
        )
    }
}

impl StructuredLog for StageMissing<'_> {
    fn log(&self) {
        tracing::error!(stage = self.stage, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stage_missing",
            span_name = name,
            stage = self.stage,
            task_id = self.task_id,
        )
    }
}

/// A result-bus subscriber fell behind and missed events.
///
/// # Log Level
/// `warn!` - Results were dropped for this subscriber
pub struct SubscriptionLagged<'a> {
    pub method: &'a str,
    pub skipped: u64,
}

impl Display for SubscriptionLagged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subscriber of '{}' lagged behind the result bus, {} results skipped",
            self.method, self.skipped
        )
    }
}

impl StructuredLog for SubscriptionLagged<'_> {
    fn log(&self) {
        tracing::warn!(method = self.method, skipped = self.skipped, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "subscription_lagged",
            span_name = name,
            method = self.method,
            skipped = self.skipped,
        )
    }
}

/// The engine worker stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct EngineStopped {
    pub live_tasks: usize,
}

impl Display for EngineStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Engine stopped with {} live tasks", self.live_tasks)
    }
}

impl StructuredLog for EngineStopped {
    fn log(&self) {
        tracing::info!(live_tasks = self.live_tasks, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("engine_stopped", span_name = name, live_tasks = self.live_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_message_mentions_missing_delivery() {
        let msg = TaskFinished {
            task_id: 4,
            method: "m",
            delivered: false,
            elapsed: Duration::from_millis(5),
        };
        assert_eq!(
            msg.to_string(),
            "Task 4 for 'm' finished in 5ms without delivering a result"
        );
    }

    #[test]
    fn handler_failure_includes_error() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let msg = StageHandlerFailed {
            stage: "get_from_cache",
            task_count: 1,
            error: &error,
        };
        assert_eq!(msg.to_string(), "Stage get_from_cache handler failed for 1 tasks: boom");
    }

    #[test]
    fn lagged_subscriber_reports_skipped_count() {
        let msg = SubscriptionLagged {
            method: "user.get",
            skipped: 3,
        };
        assert_eq!(
            msg.to_string(),
            "Subscriber of 'user.get' lagged behind the result bus, 3 results skipped"
        );
    }
}
