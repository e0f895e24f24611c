// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::strategy::StageKind;
use crate::traits::InvocationBlock;

/// Entry stage of every task; follows the strategy's success branch.
pub struct InitialBlock;

#[async_trait]
impl InvocationBlock for InitialBlock {
    fn stage(&self) -> StageKind {
        StageKind::Initial
    }
}

/// Authorization check. Accepts everything until an integrator replaces it with a block
/// that verifies (or refreshes) the auth token and calls `next(false)` or `set_error` on
/// rejection.
pub struct CheckAuthBlock;

#[async_trait]
impl InvocationBlock for CheckAuthBlock {
    fn stage(&self) -> StageKind {
        StageKind::CheckAuthToken
    }
}
