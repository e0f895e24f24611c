// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Response envelope strategies.
//!
//! All three strategies return the result as JSON text so the serializer can check it
//! against the request's declared result type. A missing result is `None`.
//!
//! ```text
//! DefaultConversion:     {"error": E}                                  -> declared E
//!                        {"result": R}                                 -> R
//! InnerResultConversion: {"result": {"success": true,  "data": R}}     -> R
//!                        {"result": {"success": false, "errors": E}}   -> declared E
//! InnerErrorConversion:  {"result": {"error": E}}                      -> declared E
//!                        {"result": R}                                 -> R
//! ```

use serde_json::Value;

use crate::traits::{ConversionStrategy, EnvelopeError};

/// Standard JSON-RPC envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConversion;

impl ConversionStrategy for DefaultConversion {
    fn check_error_or_result(&self, response: &Value) -> Result<Option<String>, EnvelopeError> {
        let envelope = as_object(response)?;
        if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
            return Err(EnvelopeError::Declared(error.to_string()));
        }
        Ok(envelope.get("result").map(Value::to_string))
    }
}

/// Result wrapped once more in a `{success, data, errors}` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerResultConversion;

impl ConversionStrategy for InnerResultConversion {
    fn check_error_or_result(&self, response: &Value) -> Result<Option<String>, EnvelopeError> {
        let envelope = as_object(response)?;
        if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
            return Err(EnvelopeError::Declared(error.to_string()));
        }
        let inner = match envelope.get("result") {
            Some(inner) => inner,
            None => return Ok(None),
        };
        let success = inner
            .get("success")
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                EnvelopeError::Malformed("result carries no boolean 'success' field".into())
            })?;
        if success {
            Ok(inner.get("data").map(Value::to_string))
        } else {
            let errors = inner.get("errors").cloned().unwrap_or(Value::Null);
            Err(EnvelopeError::Declared(errors.to_string()))
        }
    }
}

/// Application error reported inside the result object.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerErrorConversion;

impl ConversionStrategy for InnerErrorConversion {
    fn check_error_or_result(&self, response: &Value) -> Result<Option<String>, EnvelopeError> {
        let envelope = as_object(response)?;
        if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
            return Err(EnvelopeError::Declared(error.to_string()));
        }
        let result = envelope.get("result");
        if let Some(error) = result.and_then(|r| r.get("error")).filter(|e| !e.is_null()) {
            return Err(EnvelopeError::Declared(error.to_string()));
        }
        Ok(result.map(Value::to_string))
    }
}

fn as_object(response: &Value) -> Result<&serde_json::Map<String, Value>, EnvelopeError> {
    response
        .as_object()
        .ok_or_else(|| EnvelopeError::Malformed(format!("response is not an object: {}", response)))
}
