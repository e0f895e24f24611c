// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::Duration;

use crate::config::consts::DEFAULT_QUEUE_TIME_THRESHOLD;
use crate::engine::Promise;
use crate::errors::RpcError;
use crate::strategy::StageKind;

/// How a stage admits tasks from its input queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAlgorithm {
    /// Each task is handed to [`InvocationBlock::on_entity`] as soon as it arrives.
    Immediate,
    /// Tasks are buffered for [`InvocationBlock::queue_time_threshold`] and handed to
    /// [`InvocationBlock::on_queue_consumed`] together.
    TimeThreshold,
}

/// A unit of work bound to exactly one stage.
///
/// A block receives one [`Promise`] per task and must eventually complete it exactly once
/// (`set_result`, `set_error`, `next`/`pass` or `set_next_index(es)`). Returning `Err`
/// completes every still-open promise of the call with a failure carrying that error; a
/// panic completes them with [`RpcError::UnknownExternal`].
#[async_trait]
pub trait InvocationBlock: Send + Sync {
    fn stage(&self) -> StageKind;

    fn queue_algorithm(&self) -> QueueAlgorithm {
        QueueAlgorithm::Immediate
    }

    fn queue_time_threshold(&self) -> Duration {
        DEFAULT_QUEUE_TIME_THRESHOLD
    }

    /// Pass-through: follow the strategy's success branch.
    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        promise.next(true);
        Ok(())
    }

    async fn on_queue_consumed(&self, promises: Vec<Promise>) -> Result<(), RpcError> {
        for promise in promises {
            if let Err(e) = self.on_entity(promise.clone()).await {
                promise.set_error(e);
            }
        }
        Ok(())
    }
}
