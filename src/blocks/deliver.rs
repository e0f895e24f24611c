// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::engine::{Promise, Verdict};
use crate::errors::RpcError;
use crate::strategy::StageKind;
use crate::traits::InvocationBlock;

/// Delivers the task's last success to its subscribers.
pub struct DeliverResultBlock;

#[async_trait]
impl InvocationBlock for DeliverResultBlock {
    fn stage(&self) -> StageKind {
        StageKind::DeliverResult
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        let verdict = promise.task().last_success().ok_or_else(|| {
            RpcError::InterruptFlowRequested("no successful result to deliver".into())
        })?;
        promise.task().deliver(verdict);
        promise.next(true);
        Ok(())
    }
}

/// Delivers the task's last failure to its subscribers.
///
/// A task routed here without any recorded failure delivers
/// [`RpcError::InterruptFlowRequested`].
pub struct DeliverErrorBlock;

#[async_trait]
impl InvocationBlock for DeliverErrorBlock {
    fn stage(&self) -> StageKind {
        StageKind::DeliverError
    }

    async fn on_entity(&self, promise: Promise) -> Result<(), RpcError> {
        let verdict = promise.task().last_error().unwrap_or_else(|| Verdict::Failure {
            error: RpcError::InterruptFlowRequested("flow ended without a result".into()),
            next: Vec::new(),
        });
        promise.task().deliver(verdict);
        promise.next(true);
        Ok(())
    }
}
