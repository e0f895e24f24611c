// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cache lookup and cache write stages. Neither stage ever fails a task: unreadable
//! entries count as misses and write failures are only logged.

use async_trait::async_trait;
use std::sync::Arc;

use crate::engine::{Promise, Verdict};
use crate::errors::RpcError;
use crate::observability::messages::cache::{CacheHit, CacheReadFailed, CacheWriteFailed};
use crate::observability::messages::StructuredLog;
use crate::strategy::StageKind;
use crate::traits::{CacheStore, InvocationBlock, Serializer};

pub struct GetFromCacheBlock {
    cache: Arc<dyn CacheStore>,
    serializer: Arc<dyn Serializer>,
}

impl GetFromCacheBlock {
    pub fn new(cache: Arc<dyn CacheStore>, serializer: Arc<dyn Serializer>) -> Self {
        Self { cache, serializer }
    }
}

#[async_trait]
impl InvocationBlock for GetFromCacheBlock {
    fn stage(&self) -> StageKind {
        StageKind::GetFromCache
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        let descriptor = promise.task().descriptor();
        let cached = self
            .cache
            .obtain(&descriptor.cache_key)
            .await
            .and_then(|raw| match raw {
                Some(raw) => self
                    .serializer
                    .deserialize(Some(&raw), &descriptor.result_type)
                    .map(|payload| Some((payload, raw))),
                None => Ok(None),
            });

        match cached {
            Ok(Some((payload, raw))) => {
                CacheHit {
                    method: &descriptor.method,
                    task_id: promise.task().id(),
                }
                .log();
                promise.set_result(payload, Some(raw));
            }
            Ok(None) => {
                promise.pass();
            }
            Err(error) => {
                CacheReadFailed {
                    method: &descriptor.method,
                    error: &error,
                }
                .log();
                promise.pass();
            }
        }
        Ok(())
    }
}

pub struct SaveToCacheBlock {
    cache: Arc<dyn CacheStore>,
}

impl SaveToCacheBlock {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl InvocationBlock for SaveToCacheBlock {
    fn stage(&self) -> StageKind {
        StageKind::SaveToCache
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        let descriptor = promise.task().descriptor();
        if let Some(Verdict::Success { raw: Some(raw), .. }) = promise.task().last_success() {
            if let Err(error) = self
                .cache
                .store(&descriptor.cache_key, &raw, descriptor.expires_after)
                .await
            {
                CacheWriteFailed {
                    method: &descriptor.method,
                    error: &error,
                }
                .log();
            }
        }
        promise.next(true);
        Ok(())
    }
}
