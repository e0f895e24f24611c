// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::consts::JSONRPC_VERSION;
use crate::errors::RequestBuildError;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// JSON-RPC 2.0 request body.
///
/// Every request gets a fresh process-wide id so batched responses can be matched back to
/// their requests. The id is excluded from equality: two bodies are equal when their method
/// and params are equal.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub id: u64,
    jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(skip)]
    body_state: bool,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1,
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params: None,
            body_state: false,
        }
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Adds a named parameter; fails once a whole body has been set.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<&mut Self, RequestBuildError> {
        if self.body_state {
            return Err(RequestBuildError::BodyAlreadySet);
        }
        let params = self
            .params
            .get_or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = params {
            map.insert(name.into(), value);
        }
        Ok(self)
    }

    /// Uses `body` as the whole params value; fails once named parameters were added.
    pub fn set_params_body(&mut self, body: Value) -> Result<&mut Self, RequestBuildError> {
        if self.params.is_some() {
            return Err(RequestBuildError::ParamsAlreadySet);
        }
        self.params = Some(body);
        self.body_state = true;
        Ok(self)
    }

    /// The body with the protocol id normalised to zero; equal requests share this form.
    pub fn canonical(&self) -> Self {
        Self {
            id: 0,
            ..self.clone()
        }
    }
}

impl PartialEq for RpcRequest {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.params == other.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_unique_and_ignored_by_equality() {
        let mut a = RpcRequest::new("user.get");
        let mut b = RpcRequest::new("user.get");
        a.add_parameter("id", json!(7)).unwrap();
        b.add_parameter("id", json!(7)).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a.canonical()).unwrap(),
            serde_json::to_string(&b.canonical()).unwrap()
        );
    }

    #[test]
    fn serializes_as_json_rpc() {
        let mut request = RpcRequest::new("user.get");
        request.add_parameter("id", json!(7)).unwrap();
        let value = serde_json::to_value(request.canonical()).unwrap();
        assert_eq!(
            value,
            json!({"id": 0, "jsonrpc": "2.0", "method": "user.get", "params": {"id": 7}})
        );

        let bare = serde_json::to_value(RpcRequest::new("ping").canonical()).unwrap();
        assert!(bare.get("params").is_none());
    }

    #[test]
    fn params_and_body_are_exclusive() {
        let mut named = RpcRequest::new("m");
        named.add_parameter("p1", json!(1)).unwrap();
        assert_eq!(
            named.set_params_body(json!("p2")).unwrap_err(),
            RequestBuildError::ParamsAlreadySet
        );

        let mut body = RpcRequest::new("m");
        body.set_params_body(json!([1, 2])).unwrap();
        assert_eq!(
            body.add_parameter("p1", json!(1)).unwrap_err(),
            RequestBuildError::BodyAlreadySet
        );
        assert_eq!(
            body.set_params_body(json!([3])).unwrap_err(),
            RequestBuildError::ParamsAlreadySet
        );
    }
}
