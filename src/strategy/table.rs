// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative routing tables.
//!
//! A [`StrategyTable`] maps a stage to a [`Decision`]: the stages a task moves to when the
//! stage succeeds, and the stages it moves to when the stage fails. Stages missing from the
//! table route nowhere, which finishes the task.
//!
//! The preset [`InvocationStrategy`] values cover the common cache/network combinations:
//!
//! ```text
//! NoCache:         initial -> net -> deliver_result | resolve_error
//! PriorityCache:   initial -> cache -> deliver_result | net -> (deliver_result + save_to_cache) | resolve_error
//! PriorityRequest: initial -> net -> (deliver_result + save_to_cache) | cache -> deliver_result | resolve_error
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::StageKind;
use crate::config::consts::RETRY_NETWORK_ERROR_KEY;

/// Next-stage sets for one stage, split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub on_success: Vec<StageKind>,
    #[serde(default)]
    pub on_failure: Vec<StageKind>,
}

impl Decision {
    pub fn new(on_success: Vec<StageKind>, on_failure: Vec<StageKind>) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }

    /// Routes to `next` on success and nowhere on failure.
    pub fn to(next: StageKind) -> Self {
        Self::new(vec![next], Vec::new())
    }

    pub fn either(on_success: StageKind, on_failure: StageKind) -> Self {
        Self::new(vec![on_success], vec![on_failure])
    }

    pub fn get(&self, success: bool) -> &[StageKind] {
        if success {
            &self.on_success
        } else {
            &self.on_failure
        }
    }
}

/// One named routing table plus free-form metadata flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StrategyTable {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub algorithm: HashMap<StageKind, Decision>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StrategyTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn route(mut self, stage: StageKind, decision: Decision) -> Self {
        self.algorithm.insert(stage, decision);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Built-in strategies, combinable through [`MergedStrategy`](super::MergedStrategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStrategy {
    NoCache,
    RequestExcludeCache,
    PriorityRequest,
    PriorityCache,
    RetryIfNoNetwork,
    AuthorizedRequest,
}

impl InvocationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            InvocationStrategy::NoCache => "no_cache",
            InvocationStrategy::RequestExcludeCache => "request_exclude_cache",
            InvocationStrategy::PriorityRequest => "priority_request",
            InvocationStrategy::PriorityCache => "priority_cache",
            InvocationStrategy::RetryIfNoNetwork => "retry_if_no_network",
            InvocationStrategy::AuthorizedRequest => "authorized_request",
        }
    }

    pub fn table(&self) -> StrategyTable {
        use StageKind::*;

        let table = StrategyTable::new(self.name());
        match self {
            InvocationStrategy::NoCache => table
                .route(Initial, Decision::to(GetFromNet))
                .route(CheckAuthToken, Decision::either(GetFromNet, DeliverError))
                .route(GetFromNet, Decision::either(DeliverResult, ResolveError)),
            InvocationStrategy::RequestExcludeCache => table
                .route(Initial, Decision::to(GetFromNet))
                .route(CheckAuthToken, Decision::either(GetFromNet, DeliverError))
                .route(
                    GetFromNet,
                    Decision::new(vec![DeliverResult, SaveToCache], vec![ResolveError]),
                ),
            InvocationStrategy::PriorityRequest => table
                .route(Initial, Decision::to(GetFromNet))
                .route(CheckAuthToken, Decision::either(GetFromNet, DeliverError))
                .route(
                    GetFromNet,
                    Decision::new(vec![DeliverResult, SaveToCache], vec![GetFromCache]),
                )
                .route(GetFromCache, Decision::either(DeliverResult, ResolveError)),
            InvocationStrategy::PriorityCache => table
                .route(Initial, Decision::to(GetFromCache))
                .route(CheckAuthToken, Decision::either(GetFromCache, DeliverError))
                .route(GetFromCache, Decision::either(DeliverResult, GetFromNet))
                .route(
                    GetFromNet,
                    Decision::new(vec![DeliverResult, SaveToCache], vec![ResolveError]),
                ),
            InvocationStrategy::RetryIfNoNetwork => table.meta(RETRY_NETWORK_ERROR_KEY, "true"),
            InvocationStrategy::AuthorizedRequest => {
                table.route(Initial, Decision::to(CheckAuthToken))
            }
        }
    }
}

impl fmt::Display for InvocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InvocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_cache" => Ok(InvocationStrategy::NoCache),
            "request_exclude_cache" => Ok(InvocationStrategy::RequestExcludeCache),
            "priority_request" => Ok(InvocationStrategy::PriorityRequest),
            "priority_cache" => Ok(InvocationStrategy::PriorityCache),
            "retry_if_no_network" => Ok(InvocationStrategy::RetryIfNoNetwork),
            "authorized_request" => Ok(InvocationStrategy::AuthorizedRequest),
            other => Err(format!("unknown invocation strategy '{}'", other)),
        }
    }
}

impl From<InvocationStrategy> for StrategyTable {
    fn from(strategy: InvocationStrategy) -> Self {
        strategy.table()
    }
}
