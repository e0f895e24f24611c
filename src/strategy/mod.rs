// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage routing: stage names, per-stage decisions and strategy merging.

mod merged;
mod stage;
mod table;

pub use merged::MergedStrategy;
pub use stage::StageKind;
pub use table::{Decision, InvocationStrategy, StrategyTable};
