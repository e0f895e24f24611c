// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Contracts of the collaborators the engine consumes.
//!
//! None of these are implemented by the engine itself; integrators plug in their HTTP
//! client, persistent cache and validation rules. Default implementations for tests and
//! simple setups live in [`crate::backends`]. All collaborators are shared between
//! concurrently running stages and must be internally thread-safe.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{RpcError, TransportError};
use crate::rpc::ResultType;
use crate::strategy::MergedStrategy;

/// Body and headers of a successful (2xx) response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl TransportResponse {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Pushes raw request data to the server.
///
/// Requests sharing the same `Arc<dyn Transport>` instance are candidates for one combined
/// wire call; the instance identity is the batching affinity key.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute_get(
        &self,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError>;

    async fn execute_post(
        &self,
        body: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Key/value store for raw serialized results.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn store(&self, key: &str, value: &str, expires_after: Duration) -> Result<(), RpcError>;

    async fn obtain(&self, key: &str) -> Result<Option<String>, RpcError>;
}

/// Converts values to and from their wire representation.
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<String, RpcError>;

    /// Parses `body` and checks it against the declared result type. `None` is a missing body.
    fn deserialize(&self, body: Option<&str>, result_type: &ResultType) -> Result<Value, RpcError>;
}

/// Outcome of unwrapping a response envelope that did not yield a result.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    /// The envelope does not have the expected shape.
    Malformed(String),
    /// The server declared an application error; carries the serialized error payload.
    Declared(String),
}

/// Extracts the result (or the declared error) from a parsed response envelope.
pub trait ConversionStrategy: Send + Sync {
    /// Returns the serialized result, `None` when the envelope carries no result.
    fn check_error_or_result(&self, response: &Value) -> Result<Option<String>, EnvelopeError>;
}

/// Semantic checks on a deserialized model.
pub trait Validator: Send + Sync {
    fn validate(&self, body: &Value) -> Result<(), RpcError>;
}

/// Supplies the header snapshot taken when a request descriptor is built.
pub trait HeaderProvider: Send + Sync {
    fn headers(&self) -> HashMap<String, String>;
}

/// Receives response headers for the methods it registered for.
pub trait HeaderListener: Send + Sync {
    fn on_new_header(&self, method: &str, name: &str, value: &str);
}

/// Optional sink for task latency.
pub trait TimeTracker: Send + Sync {
    fn on_task_finished(&self, strategy: &MergedStrategy, method: &str, elapsed: Duration);
}

/// Callback form of an ad-hoc result subscription.
pub trait RequestCallback: Send + Sync {
    fn on_success(&self, response: Value);

    fn on_failure(&self, error: RpcError);
}
