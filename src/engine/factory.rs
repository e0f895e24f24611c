// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::dispatch::StageRunner;
use super::flow::EngineParts;
use super::Engine;
use crate::backends::{HeaderObserver, InMemoryCache, JsonSerializer, NoopValidator};
use crate::blocks::{
    CheckAuthBlock, DeliverErrorBlock, DeliverResultBlock, GetFromCacheBlock, GetFromNetBlock,
    InitialBlock, ResolveErrorBlock, SaveToCacheBlock,
};
use crate::config::consts::{
    DEFAULT_MAX_NETWORK_RETRIES, DEFAULT_QUEUE_TIME_THRESHOLD, RESULT_BUS_CAPACITY,
};
use crate::strategy::StageKind;
use crate::traits::{CacheStore, InvocationBlock, Serializer, TimeTracker, Validator};

/// Assembles an [`Engine`] from its collaborators.
///
/// Every stage gets the built-in block unless one is supplied with
/// [`with_block`](Self::with_block).
pub struct EngineBuilder {
    cache: Arc<dyn CacheStore>,
    serializer: Arc<dyn Serializer>,
    validator: Arc<dyn Validator>,
    headers: HeaderObserver,
    batch_window: Duration,
    max_network_retries: usize,
    io: Option<Handle>,
    time_tracker: Option<Arc<dyn TimeTracker>>,
    blocks: HashMap<StageKind, Arc<dyn InvocationBlock>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            cache: Arc::new(InMemoryCache::new()),
            serializer: Arc::new(JsonSerializer),
            validator: Arc::new(NoopValidator),
            headers: HeaderObserver::new(),
            batch_window: DEFAULT_QUEUE_TIME_THRESHOLD,
            max_network_retries: DEFAULT_MAX_NETWORK_RETRIES,
            io: None,
            time_tracker: None,
            blocks: HashMap::new(),
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Shares an existing header registry with the network stage.
    pub fn header_observer(mut self, headers: HeaderObserver) -> Self {
        self.headers = headers;
        self
    }

    /// Window of the network stage's batching queue.
    pub fn batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    pub fn max_network_retries(mut self, retries: usize) -> Self {
        self.max_network_retries = retries;
        self
    }

    /// Runtime that runs block bodies; defaults to the runtime calling [`build`](Self::build).
    pub fn io_handle(mut self, io: Handle) -> Self {
        self.io = Some(io);
        self
    }

    pub fn time_tracker(mut self, tracker: Arc<dyn TimeTracker>) -> Self {
        self.time_tracker = Some(tracker);
        self
    }

    /// Replaces the built-in block of `block.stage()`.
    pub fn with_block(mut self, block: Arc<dyn InvocationBlock>) -> Self {
        self.blocks.insert(block.stage(), block);
        self
    }

    fn default_block(&self, stage: StageKind) -> Arc<dyn InvocationBlock> {
        match stage {
            StageKind::Initial => Arc::new(InitialBlock),
            StageKind::CheckAuthToken => Arc::new(CheckAuthBlock),
            StageKind::GetFromCache => Arc::new(GetFromCacheBlock::new(
                self.cache.clone(),
                self.serializer.clone(),
            )),
            StageKind::GetFromNet => Arc::new(
                GetFromNetBlock::new(
                    self.serializer.clone(),
                    self.validator.clone(),
                    self.headers.clone(),
                )
                .with_window(self.batch_window),
            ),
            StageKind::SaveToCache => Arc::new(SaveToCacheBlock::new(self.cache.clone())),
            StageKind::DeliverResult => Arc::new(DeliverResultBlock),
            StageKind::DeliverError => Arc::new(DeliverErrorBlock),
            StageKind::ResolveError => Arc::new(ResolveErrorBlock::new(self.max_network_retries)),
        }
    }

    /// Starts the engine's worker and stage loops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(mut self) -> Engine {
        let io = self.io.take().unwrap_or_else(Handle::current);
        let shutdown = CancellationToken::new();
        let (commands, receiver) = mpsc::unbounded_channel();
        let (bus, _) = broadcast::channel(RESULT_BUS_CAPACITY);
        let mut custom = std::mem::take(&mut self.blocks);

        let stages = StageKind::ALL
            .iter()
            .map(|stage| {
                let block = custom
                    .remove(stage)
                    .unwrap_or_else(|| self.default_block(*stage));
                let queue = StageRunner::new(block, commands.clone(), io.clone())
                    .spawn(shutdown.clone());
                (*stage, queue)
            })
            .collect();

        Engine::start(EngineParts {
            stages,
            commands,
            receiver,
            bus,
            headers: self.headers,
            time_tracker: self.time_tracker,
            shutdown,
        })
    }
}
