// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] for emitting the same event with structured fields.
//!
//! # Organization
//!
//! * `engine` - task lifecycle, binding and stage dispatch events
//! * `network` - batching decisions and wire calls of the network stage
//! * `cache` - cache lookups and swallowed cache failures
//! * `validation` - configuration validation results
//!
//! # Usage Pattern
//!
//! ```rust
//! use rpc_taskflow::observability::messages::engine::TaskCreated;
//! use rpc_taskflow::observability::messages::StructuredLog;
//!
//! let msg = TaskCreated {
//!     task_id: 7,
//!     method: "user.get",
//!     strategy: "no_cache",
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod cache;
pub mod engine;
pub mod network;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emits the event at the message's level.
    fn log(&self);

    /// Builds a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
