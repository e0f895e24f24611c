// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Immutable description of one call through the pipeline.
//!
//! A [`RequestDescriptor`] is everything a stage needs to know about a request: the
//! serialized body, where to send it, how to route it and how to interpret the answer.
//! Two descriptors with the same method and the same canonical body (protocol id set to
//! zero) are equivalent: they share a cache entry and may share one in-flight task.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::RpcRequest;
use crate::backends::conversion::DefaultConversion;
use crate::config::consts::{APPLICATION_METHOD_QUERY, DEFAULT_MAX_BATCH_SIZE, NEVER_EXPIRES};
use crate::errors::RpcError;
use crate::strategy::MergedStrategy;
use crate::traits::{ConversionStrategy, Serializer, Transport};

/// HTTP verb of a request. POST sends the body; GET sends only headers and query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// Declared result type of a request, checked when a payload is deserialized.
#[derive(Clone)]
pub struct ResultType {
    name: &'static str,
    check: fn(&Value) -> Result<(), String>,
}

impl ResultType {
    pub fn of<T: DeserializeOwned>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            check: check_as::<T>,
        }
    }

    /// Accepts any JSON value.
    pub fn any() -> Self {
        Self::of::<Value>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn check(&self, value: &Value) -> Result<(), RpcError> {
        (self.check)(value).map_err(|reason| {
            RpcError::conversion(format!("expected {}: {}", self.name, reason))
        })
    }
}

impl fmt::Debug for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn check_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    T::deserialize(value).map(|_| ()).map_err(|e| e.to_string())
}

pub struct RequestDescriptor {
    pub method: String,
    pub http_method: HttpMethod,
    pub query: HashMap<String, String>,
    pub body: RpcRequest,
    /// Serialized body sent on the wire, with the real protocol id.
    pub flat_request: String,
    /// Serialized canonical body; cache key and dedup key.
    pub cache_key: String,
    pub result_type: ResultType,
    pub transport: Arc<dyn Transport>,
    pub strategy: Arc<MergedStrategy>,
    pub expires_after: Duration,
    pub conversion: Arc<dyn ConversionStrategy>,
    pub headers: HashMap<String, String>,
    pub bindable: bool,
    pub max_batch_size: usize,
}

impl RequestDescriptor {
    pub fn builder(body: RpcRequest, transport: Arc<dyn Transport>) -> DescriptorBuilder {
        DescriptorBuilder::new(body, transport)
    }

    /// True when both requests go through the same transport instance.
    pub fn same_transport(&self, other: &RequestDescriptor) -> bool {
        same_instance(&self.transport, &other.transport)
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("http_method", &self.http_method)
            .field("cache_key", &self.cache_key)
            .field("result_type", &self.result_type)
            .field("strategy", &self.strategy.label())
            .field("bindable", &self.bindable)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

/// Compares the data pointers only; vtable pointers of one instance may differ.
pub(crate) fn same_instance(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

pub struct DescriptorBuilder {
    body: RpcRequest,
    transport: Arc<dyn Transport>,
    http_method: HttpMethod,
    query: Option<HashMap<String, String>>,
    result_type: ResultType,
    strategy: Option<Arc<MergedStrategy>>,
    expires_after: Duration,
    conversion: Option<Arc<dyn ConversionStrategy>>,
    headers: HashMap<String, String>,
    bindable: bool,
    max_batch_size: usize,
}

impl DescriptorBuilder {
    fn new(body: RpcRequest, transport: Arc<dyn Transport>) -> Self {
        Self {
            body,
            transport,
            http_method: HttpMethod::Post,
            query: None,
            result_type: ResultType::any(),
            strategy: None,
            expires_after: NEVER_EXPIRES,
            conversion: None,
            headers: HashMap::new(),
            bindable: true,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn http_method(mut self, http_method: HttpMethod) -> Self {
        self.http_method = http_method;
        self
    }

    pub fn query(mut self, query: HashMap<String, String>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn strategy(mut self, strategy: Arc<MergedStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }

    pub fn conversion(mut self, conversion: Arc<dyn ConversionStrategy>) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn bindable(mut self, bindable: bool) -> Self {
        self.bindable = bindable;
        self
    }

    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    pub fn build(self, serializer: &dyn Serializer) -> Result<RequestDescriptor, RpcError> {
        let flat_request = serializer.serialize(&serde_json::to_value(&self.body)?)?;
        let cache_key = serializer.serialize(&serde_json::to_value(self.body.canonical())?)?;
        let method = self.body.method.clone();
        let query = self.query.unwrap_or_else(|| {
            HashMap::from([(APPLICATION_METHOD_QUERY.to_string(), method.clone())])
        });

        Ok(RequestDescriptor {
            method,
            http_method: self.http_method,
            query,
            body: self.body,
            flat_request,
            cache_key,
            result_type: self.result_type,
            transport: self.transport,
            strategy: self
                .strategy
                .unwrap_or_else(|| Arc::new(MergedStrategy::fallback())),
            expires_after: self.expires_after,
            conversion: self
                .conversion
                .unwrap_or_else(|| Arc::new(DefaultConversion)),
            headers: self.headers,
            bindable: self.bindable,
            max_batch_size: self.max_batch_size,
        })
    }
}
