// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;

use crate::errors::RpcError;
use crate::traits::Validator;

/// Accepts every model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _body: &Value) -> Result<(), RpcError> {
        Ok(())
    }
}

/// Rejects models with `null` object fields, searched through nested objects and arrays.
///
/// With `throw_first` the first null field fails validation; otherwise every null field
/// path is collected into one error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectNullsValidator {
    pub throw_first: bool,
}

impl RejectNullsValidator {
    pub fn new(throw_first: bool) -> Self {
        Self { throw_first }
    }

    fn collect(&self, value: &Value, path: &str, found: &mut Vec<String>) {
        if self.throw_first && !found.is_empty() {
            return;
        }
        match value {
            Value::Object(fields) => {
                for (name, field) in fields {
                    let field_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", path, name)
                    };
                    if field.is_null() {
                        found.push(field_path);
                        if self.throw_first {
                            return;
                        }
                    } else {
                        self.collect(field, &field_path, found);
                    }
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.collect(item, &format!("{}[{}]", path, index), found);
                }
            }
            _ => {}
        }
    }
}

impl Validator for RejectNullsValidator {
    fn validate(&self, body: &Value) -> Result<(), RpcError> {
        let mut found = Vec::new();
        self.collect(body, "", &mut found);
        if found.is_empty() {
            Ok(())
        } else {
            Err(RpcError::validation(format!(
                "null value in required fields: {}",
                found.join(", ")
            )))
        }
    }
}
