// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced to callers of the request pipeline.
//!
//! Every failure a task can end with is an [`RpcError`]. The type is `Clone` because a
//! single terminal failure is multicast to every subscriber bound to the task, and it is
//! kept in the task's delivered log for late subscribers.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Coarse classification of an [`RpcError`], used by stages that route on error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    HttpCode,
    Conversion,
    ResponseError,
    Validation,
    UnknownExternal,
    InterruptFlowRequested,
}

/// Terminal error of a request.
#[derive(Error, Debug, Clone)]
pub enum RpcError {
    /// I/O failure while talking to the transport.
    #[error("Network error: {0}")]
    Network(#[source] Arc<std::io::Error>),

    /// The server answered with a non-2xx status.
    #[error("Http code error: {code}")]
    HttpCode { code: u16, body: Option<String> },

    /// The payload could not be parsed, or did not match the declared result type.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// The server reported an application error inside the response envelope.
    #[error("Response error: {error}")]
    ResponseError { error: Value },

    /// The deserialized model failed semantic validation.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A stage handler crashed while processing the task.
    #[error("Unknown external error: {message}")]
    UnknownExternal { message: String },

    /// A stage asked to leave the flow early.
    #[error("Interrupt flow requested: {0}")]
    InterruptFlowRequested(String),
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::Network(_) => ErrorKind::Network,
            RpcError::HttpCode { .. } => ErrorKind::HttpCode,
            RpcError::Conversion { .. } => ErrorKind::Conversion,
            RpcError::ResponseError { .. } => ErrorKind::ResponseError,
            RpcError::Validation { .. } => ErrorKind::Validation,
            RpcError::UnknownExternal { .. } => ErrorKind::UnknownExternal,
            RpcError::InterruptFlowRequested(_) => ErrorKind::InterruptFlowRequested,
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        RpcError::Conversion {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        RpcError::Validation {
            message: message.into(),
        }
    }

    pub fn unknown_external(message: impl Into<String>) -> Self {
        RpcError::UnknownExternal {
            message: message.into(),
        }
    }

    /// Reads the declared error payload as a JSON-RPC error object, if it has that shape.
    pub fn as_rpc_error_response(&self) -> Option<RpcErrorResponse> {
        match self {
            RpcError::ResponseError { error } => serde_json::from_value(error.clone()).ok(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RpcError {
    fn from(error: std::io::Error) -> Self {
        RpcError::Network(Arc::new(error))
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        RpcError::conversion(error.to_string())
    }
}

/// Failure reported by a [`Transport`](crate::traits::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Http code error: {code}")]
    HttpCode { code: u16, body: Option<String> },
}

impl From<TransportError> for RpcError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Io(e) => RpcError::Network(Arc::new(e)),
            TransportError::HttpCode { code, body } => RpcError::HttpCode { code, body },
        }
    }
}

/// Standard JSON-RPC error object carried by `{"error": {...}}` responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcErrorResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_errors_map_to_kinds() {
        let io: RpcError =
            TransportError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow")).into();
        assert_eq!(io.kind(), ErrorKind::Network);

        let http: RpcError = TransportError::HttpCode {
            code: 502,
            body: Some("bad gateway".into()),
        }
        .into();
        assert_eq!(http.kind(), ErrorKind::HttpCode);
        assert_eq!(http.to_string(), "Http code error: 502");
    }

    #[test]
    fn declared_error_reads_as_rpc_error_response() {
        let error = RpcError::ResponseError {
            error: json!({"code": 1, "message": "test"}),
        };
        let response = error.as_rpc_error_response().unwrap();
        assert_eq!(response.code, Some(1));
        assert_eq!(response.message.as_deref(), Some("test"));
        assert!(RpcError::validation("x").as_rpc_error_response().is_none());
    }
}
