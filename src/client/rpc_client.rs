// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::MethodSpec;
use crate::backends::JsonSerializer;
use crate::config::consts::DEFAULT_MAX_BATCH_SIZE;
use crate::engine::{Engine, TaskHandle};
use crate::errors::{ClientError, RequestBuildError, RpcError};
use crate::rpc::{RequestDescriptor, ResultType};
use crate::traits::{HeaderProvider, Serializer, Transport};

/// Typed front door of the pipeline: turns `(method, params)` into request descriptors
/// using a declared method table, and runs them on an [`Engine`].
pub struct RpcClient {
    engine: Engine,
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn Serializer>,
    header_provider: Option<Arc<dyn HeaderProvider>>,
    max_batch_size: usize,
    methods: HashMap<String, MethodSpec>,
}

impl RpcClient {
    pub fn new(engine: Engine, transport: Arc<dyn Transport>) -> Self {
        Self {
            engine,
            transport,
            serializer: Arc::new(JsonSerializer),
            header_provider: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            methods: HashMap::new(),
        }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Headers snapshotted into every descriptor.
    pub fn with_header_provider(mut self, provider: Arc<dyn HeaderProvider>) -> Self {
        self.header_provider = Some(provider);
        self
    }

    /// Batch size of every method not declared `no_batch`.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Adds (or replaces) a method declaration.
    pub fn register(mut self, spec: MethodSpec) -> Self {
        self.methods.insert(spec.name().to_string(), spec);
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSpec> {
        self.methods.values()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Builds the descriptor for one call of `method`.
    pub fn descriptor<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
        result_type: ResultType,
    ) -> Result<RequestDescriptor, ClientError> {
        let spec = self
            .methods
            .get(method)
            .ok_or_else(|| RequestBuildError::UnknownMethod(method.to_string()))?;
        let params = serde_json::to_value(params).map_err(|e| RequestBuildError::InvalidParams {
            method: method.to_string(),
            reason: e.to_string(),
        })?;
        let body = spec.body(params)?;
        let headers = self
            .header_provider
            .as_ref()
            .map(|provider| provider.headers())
            .unwrap_or_default();
        let max_batch_size = if spec.is_no_batch() {
            1
        } else {
            self.max_batch_size
        };

        let descriptor = RequestDescriptor::builder(body, self.transport.clone())
            .http_method(spec.method_http())
            .result_type(result_type)
            .strategy(spec.strategy().clone())
            .expires_after(spec.expiry())
            .conversion(spec.conversion_strategy().clone())
            .headers(headers)
            .bindable(spec.is_bindable())
            .max_batch_size(max_batch_size)
            .build(self.serializer.as_ref())?;
        Ok(descriptor)
    }

    /// Fires a call without waiting for its result.
    pub async fn submit<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<TaskHandle, ClientError> {
        let descriptor = self.descriptor(method, params, ResultType::any())?;
        Ok(self.engine.execute_post(descriptor).await?)
    }

    /// Calls `method` and deserializes the result into `T`.
    pub async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, ClientError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let descriptor = self.descriptor(method, params, ResultType::of::<T>())?;
        let value = self.engine.execute(descriptor).await?;
        serde_json::from_value(value).map_err(|e| ClientError::Rpc(RpcError::from(e)))
    }

    /// Calls `method` and returns the raw JSON result.
    pub async fn call_value(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        self.call(method, &params).await
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("methods", &self.methods.len())
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}
