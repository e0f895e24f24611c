// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::conversion::DefaultConversion;
use crate::config::consts::NEVER_EXPIRES;
use crate::errors::RequestBuildError;
use crate::rpc::{HttpMethod, RpcRequest};
use crate::strategy::{MergedStrategy, StrategyTable};
use crate::traits::ConversionStrategy;

/// Declaration of one remote method: its full name and how calls to it travel.
#[derive(Clone)]
pub struct MethodSpec {
    name: String,
    http_method: HttpMethod,
    strategy: Arc<MergedStrategy>,
    expires_after: Duration,
    bindable: bool,
    no_batch: bool,
    conversion: Arc<dyn ConversionStrategy>,
    default_params: Map<String, Value>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            http_method: HttpMethod::Post,
            strategy: Arc::new(MergedStrategy::fallback()),
            expires_after: NEVER_EXPIRES,
            bindable: true,
            no_batch: false,
            conversion: Arc::new(DefaultConversion),
            default_params: Map::new(),
        }
    }

    /// `scope.name`, or the bare name when the scope is empty.
    pub fn scoped(scope: &str, name: &str) -> Self {
        Self::new(Self::qualified_name(scope, name))
    }

    pub fn qualified_name(scope: &str, name: &str) -> String {
        if scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", scope, name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn http_method(mut self, http_method: HttpMethod) -> Self {
        self.http_method = http_method;
        self
    }

    /// Merges `tables` in order; an empty list keeps the fallback strategy.
    pub fn strategies<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<StrategyTable>,
    {
        let tables: Vec<StrategyTable> = tables.into_iter().map(Into::into).collect();
        if !tables.is_empty() {
            self.strategy = Arc::new(MergedStrategy::merge(tables));
        }
        self
    }

    pub fn expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }

    /// Calls to this method never bind to an equivalent in-flight call.
    pub fn not_bindable(mut self) -> Self {
        self.bindable = false;
        self
    }

    /// Calls to this method always travel alone.
    pub fn no_batch(mut self) -> Self {
        self.no_batch = true;
        self
    }

    pub fn conversion(mut self, conversion: Arc<dyn ConversionStrategy>) -> Self {
        self.conversion = conversion;
        self
    }

    /// Named parameter added to every call before the caller's parameters.
    pub fn default_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.default_params.insert(name.into(), value);
        self
    }

    pub(crate) fn method_http(&self) -> HttpMethod {
        self.http_method
    }

    pub(crate) fn strategy(&self) -> &Arc<MergedStrategy> {
        &self.strategy
    }

    pub(crate) fn expiry(&self) -> Duration {
        self.expires_after
    }

    pub(crate) fn is_bindable(&self) -> bool {
        self.bindable
    }

    pub(crate) fn is_no_batch(&self) -> bool {
        self.no_batch
    }

    pub(crate) fn conversion_strategy(&self) -> &Arc<dyn ConversionStrategy> {
        &self.conversion
    }

    /// Builds the request body: defaults first, then the call's params.
    ///
    /// An object adds named params, `null` adds nothing and any other value becomes the
    /// whole params body.
    pub fn body(&self, params: Value) -> Result<RpcRequest, RequestBuildError> {
        let mut body = RpcRequest::new(self.name.clone());
        for (name, value) in &self.default_params {
            body.add_parameter(name.clone(), value.clone())?;
        }
        match params {
            Value::Null => {}
            Value::Object(named) => {
                for (name, value) in named {
                    body.add_parameter(name, value)?;
                }
            }
            whole => {
                body.set_params_body(whole)?;
            }
        }
        Ok(body)
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("http_method", &self.http_method)
            .field("strategy", &self.strategy.label())
            .field("bindable", &self.bindable)
            .field("no_batch", &self.no_batch)
            .finish()
    }
}
