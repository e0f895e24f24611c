// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Default collaborator implementations.
//!
//! The engine consumes its collaborators through the traits in [`crate::traits`]. This
//! module provides implementations good enough for tests, demos and simple setups.
//!
//! # Available Backends
//!
//! ## Serialization
//! - **JsonSerializer**: `serde_json` text, checked against the request's declared result type
//!
//! ## Caching
//! - **InMemoryCache**: per-entry expiry on Tokio's clock, with `clean()` and `clear()`
//!
//! ## Response Envelopes
//! - **DefaultConversion**: `{"error": ...}` or `{"result": ...}`
//! - **InnerResultConversion**: `{"result": {"success", "data", "errors"}}`
//! - **InnerErrorConversion**: `{"result": {"error": ...}}`
//!
//! ## Headers and Validation
//! - **HeaderObserver**: method-scoped response-header listeners
//! - **NoopValidator** / **RejectNullsValidator**
//!
//! ## Stub Transports
//! In-process transports that record every call: echo, static, failing and flaky.
//!
//! # Examples
//!
//! ```rust
//! use rpc_taskflow::backends::conversion::DefaultConversion;
//! use rpc_taskflow::traits::ConversionStrategy;
//! use serde_json::json;
//!
//! let result = DefaultConversion.check_error_or_result(&json!({"id": 1, "result": 42}));
//! assert_eq!(result, Ok(Some("42".to_string())));
//! ```

pub mod conversion;
pub mod headers;
pub mod json;
pub mod memory_cache;
pub mod stub;
pub mod validator;

pub use conversion::{DefaultConversion, InnerErrorConversion, InnerResultConversion};
pub use headers::HeaderObserver;
pub use json::JsonSerializer;
pub use memory_cache::InMemoryCache;
pub use validator::{NoopValidator, RejectNullsValidator};
