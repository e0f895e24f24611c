// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::config::consts::{DEFAULT_MAX_NETWORK_RETRIES, RETRY_NETWORK_ERROR_KEY};
use crate::engine::{Promise, Verdict};
use crate::errors::{ErrorKind, RpcError};
use crate::strategy::StageKind;
use crate::traits::InvocationBlock;

/// Decides what happens after a failed fetch.
///
/// Network failures are retried through the network stage when the strategy carries the
/// `retry_network_error` flag, up to `max_network_retries` retries per task. Everything
/// else goes to Deliver-Error. Integrators replace this block to add their own recovery
/// (re-authentication, fallbacks).
pub struct ResolveErrorBlock {
    max_network_retries: usize,
}

impl ResolveErrorBlock {
    pub fn new(max_network_retries: usize) -> Self {
        Self { max_network_retries }
    }
}

impl Default for ResolveErrorBlock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NETWORK_RETRIES)
    }
}

fn is_network_failure(verdict: &Verdict) -> bool {
    matches!(verdict, Verdict::Failure { error, .. } if error.kind() == ErrorKind::Network)
}

#[async_trait]
impl InvocationBlock for ResolveErrorBlock {
    fn stage(&self) -> StageKind {
        StageKind::ResolveError
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        let task = promise.task();
        let retry_enabled = task.descriptor().strategy.meta_flag(RETRY_NETWORK_ERROR_KEY);
        let last_is_network = task.last_error().map_or(false, |v| is_network_failure(&v));
        let network_failures = task.results().iter().filter(|v| is_network_failure(v)).count();

        if retry_enabled && last_is_network && network_failures <= self.max_network_retries {
            tracing::debug!(
                task_id = task.id(),
                attempt = network_failures,
                "Retrying network call after I/O failure"
            );
            promise.set_next_index(StageKind::GetFromNet);
        } else {
            promise.set_next_index(StageKind::DeliverError);
        }
        Ok(())
    }
}
