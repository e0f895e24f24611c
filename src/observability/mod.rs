// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Diagnostic and operational log lines are struct-based messages with a `Display`
//! implementation, so the wording lives in one place and every event carries the same
//! structured fields wherever it is emitted.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - task lifecycle and stage dispatch events
//! * `messages::network` - batching decisions and wire calls
//! * `messages::cache` - cache lookups and swallowed cache failures
//! * `messages::validation` - configuration validation results
//!
//! # Usage
//!
//! ```rust
//! use rpc_taskflow::observability::messages::network::BatchDispatched;
//! use rpc_taskflow::observability::messages::StructuredLog;
//!
//! let msg = BatchDispatched {
//!     methods: "user.get,user.get",
//!     size: 2,
//! };
//!
//! msg.log();
//! ```

pub mod messages;
