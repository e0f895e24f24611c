// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process transports for demos and tests.
//!
//! - [`EchoTransport`]: answers JSON-RPC requests (single or batched) with their params.
//! - [`StaticTransport`]: answers every call with the same body.
//! - [`FailingTransport`]: fails every call with an I/O error or an HTTP status.
//! - [`FlakyTransport`]: fails a fixed number of calls with I/O errors, then echoes.
//!
//! Every transport records the calls it received.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::consts::JSONRPC_VERSION;
use crate::errors::TransportError;
use crate::traits::{Transport, TransportResponse};

/// One call as received by a stub transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub body: Option<String>,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Number of JSON-RPC requests in the body; 0 for GET calls.
    pub batch_size: usize,
}

#[derive(Debug, Default)]
struct CallLog(Mutex<Vec<RecordedCall>>);

impl CallLog {
    fn record(&self, body: Option<&str>, headers: &HashMap<String, String>, query: &HashMap<String, String>) {
        let batch_size = match body.map(serde_json::from_str::<Value>) {
            Some(Ok(Value::Array(items))) => items.len(),
            Some(_) => 1,
            None => 0,
        };
        self.lock().push(RecordedCall {
            body: body.map(str::to_string),
            headers: headers.clone(),
            query: query.clone(),
            batch_size,
        });
    }

    fn snapshot(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Answers each request with `{"id", "jsonrpc", "result": params}`; a request without
/// params gets its method name as the result.
#[derive(Debug, Default)]
pub struct EchoTransport {
    calls: CallLog,
    response_headers: HashMap<String, String>,
    delay: Option<Duration>,
}

impl EchoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to every response.
    pub fn with_response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.insert(name.into(), value.into());
        self
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.snapshot()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Batch size of every recorded call, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().iter().map(|c| c.batch_size).collect()
    }

    fn answer(request: &Value) -> Value {
        let result = request
            .get("params")
            .cloned()
            .or_else(|| request.get("method").cloned())
            .unwrap_or(Value::Null);
        json!({
            "id": request.get("id").cloned().unwrap_or(Value::Null),
            "jsonrpc": JSONRPC_VERSION,
            "result": result,
        })
    }

    fn respond(&self, body: Value) -> TransportResponse {
        let mut response = TransportResponse::new(body.to_string());
        response.headers = self.response_headers.clone();
        response
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn execute_get(
        &self,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(None, headers, query);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.respond(json!({ "result": query })))
    }

    async fn execute_post(
        &self,
        body: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(Some(body), headers, query);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let request: Value = serde_json::from_str(body).map_err(|e| TransportError::HttpCode {
            code: 400,
            body: Some(e.to_string()),
        })?;
        let answer = match &request {
            Value::Array(items) => Value::Array(items.iter().map(Self::answer).collect()),
            single => Self::answer(single),
        };
        Ok(self.respond(answer))
    }
}

/// Answers every call with `body`.
#[derive(Debug)]
pub struct StaticTransport {
    body: String,
    calls: CallLog,
}

impl StaticTransport {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            calls: CallLog::default(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.snapshot()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn execute_get(
        &self,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(None, headers, query);
        Ok(TransportResponse::new(self.body.clone()))
    }

    async fn execute_post(
        &self,
        body: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(Some(body), headers, query);
        Ok(TransportResponse::new(self.body.clone()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Io(std::io::ErrorKind),
    Http(u16),
}

/// Fails every call.
#[derive(Debug)]
pub struct FailingTransport {
    failure: Failure,
    calls: CallLog,
}

impl FailingTransport {
    /// Fails with an I/O error, as a dropped connection would.
    pub fn io() -> Self {
        Self {
            failure: Failure::Io(std::io::ErrorKind::ConnectionRefused),
            calls: CallLog::default(),
        }
    }

    /// Fails with a non-2xx status.
    pub fn http(code: u16) -> Self {
        Self {
            failure: Failure::Http(code),
            calls: CallLog::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn error(&self) -> TransportError {
        match self.failure {
            Failure::Io(kind) => std::io::Error::new(kind, "connection refused").into(),
            Failure::Http(code) => TransportError::HttpCode {
                code,
                body: Some(format!("status {}", code)),
            },
        }
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn execute_get(
        &self,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(None, headers, query);
        Err(self.error())
    }

    async fn execute_post(
        &self,
        body: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.record(Some(body), headers, query);
        Err(self.error())
    }
}

/// Fails the first `failures` calls with I/O errors, then behaves like [`EchoTransport`].
#[derive(Debug)]
pub struct FlakyTransport {
    failures_left: AtomicUsize,
    echo: EchoTransport,
}

impl FlakyTransport {
    pub fn new(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            echo: EchoTransport::new(),
        }
    }

    /// Calls that reached the echo after the failures ran out.
    pub fn successful_calls(&self) -> usize {
        self.echo.call_count()
    }

    fn should_fail(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok()
    }

    fn error() -> TransportError {
        std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset").into()
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn execute_get(
        &self,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        if self.should_fail() {
            return Err(Self::error());
        }
        self.echo.execute_get(headers, query).await
    }

    async fn execute_post(
        &self,
        body: &str,
        headers: &HashMap<String, String>,
        query: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        if self.should_fail() {
            return Err(Self::error());
        }
        self.echo.execute_post(body, headers, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_answers_batches_in_order() {
        let transport = EchoTransport::new().with_response_header("x-token", "t");
        let body = r#"[{"id":1,"jsonrpc":"2.0","method":"a","params":{"p":1}},{"id":2,"jsonrpc":"2.0","method":"b"}]"#;
        let response = transport
            .execute_post(body, &HashMap::new(), &HashMap::new())
            .await
            .unwrap();

        let answer: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(answer[0], json!({"id": 1, "jsonrpc": "2.0", "result": {"p": 1}}));
        assert_eq!(answer[1]["result"], json!("b"));
        assert_eq!(response.headers.get("x-token").map(String::as_str), Some("t"));
        assert_eq!(transport.batch_sizes(), vec![2]);
    }

    #[tokio::test]
    async fn flaky_recovers_after_failures() {
        let transport = FlakyTransport::new(1);
        let body = r#"{"id":1,"jsonrpc":"2.0","method":"a"}"#;
        let empty = HashMap::new();

        assert!(transport.execute_post(body, &empty, &empty).await.is_err());
        assert!(transport.execute_post(body, &empty, &empty).await.is_ok());
        assert_eq!(transport.successful_calls(), 1);
    }
}
