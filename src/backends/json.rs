// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::RpcError;
use crate::rpc::ResultType;
use crate::traits::Serializer;

/// `serde_json` backed [`Serializer`].
///
/// A missing body deserializes to `null`, which only passes result types that accept it
/// (`Option<T>`, `()`, `Value`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<String, RpcError> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, body: Option<&str>, result_type: &ResultType) -> Result<Value, RpcError> {
        let value = match body {
            Some(body) => serde_json::from_str(body)?,
            None => Value::Null,
        };
        result_type.check(&value)?;
        Ok(value)
    }
}
