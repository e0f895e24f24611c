// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the cache stages. Cache failures never reach the caller, so these
//! log lines are the only trace they leave.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A cached entry was found and used.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct CacheHit<'a> {
    pub method: &'a str,
    pub task_id: u64,
}

impl Display for CacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cache hit for '{}' (task {})", self.method, self.task_id)
    }
}

impl StructuredLog for CacheHit<'_> {
    fn log(&self) {
        tracing::debug!(method = self.method, task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "cache_hit",
            span_name = name,
            method = self.method,
            task_id = self.task_id,
        )
    }
}

/// The cache could not be read or held an unusable entry; the lookup is treated as a miss.
///
/// # Log Level
/// `warn!` - Swallowed failure
///
/// # Example
/// ```
/// use rpc_taskflow::observability::messages::cache::CacheReadFailed;
/// use rpc_taskflow::errors::RpcError;
///
/// let error = RpcError::conversion("expected value at line 1 column 1");
/// let msg = CacheReadFailed {
///     method: "user.get",
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct CacheReadFailed<'a> {
    pub method: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CacheReadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring cached entry for '{}': {}",
            self.method, self.error
        )
    }
}

impl StructuredLog for CacheReadFailed<'_> {
    fn log(&self) {
        tracing::warn!(method = self.method, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_read_failed", span_name = name, method = self.method)
    }
}

/// Storing a result failed; the task carries on.
///
/// # Log Level
/// `warn!` - Swallowed failure
pub struct CacheWriteFailed<'a> {
    pub method: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CacheWriteFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Could not cache result of '{}': {}",
            self.method, self.error
        )
    }
}

impl StructuredLog for CacheWriteFailed<'_> {
    fn log(&self) {
        tracing::warn!(method = self.method, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_write_failed", span_name = name, method = self.method)
    }
}
