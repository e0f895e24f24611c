// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fmt;

/// One named step of the task pipeline.
///
/// Every engine owns exactly one invocation block per stage. The declaration order is the
/// canonical stage order used when stages are listed (logs, debug output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Initial,
    GetFromCache,
    GetFromNet,
    SaveToCache,
    DeliverResult,
    DeliverError,
    ResolveError,
    CheckAuthToken,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::Initial,
        StageKind::GetFromCache,
        StageKind::GetFromNet,
        StageKind::SaveToCache,
        StageKind::DeliverResult,
        StageKind::DeliverError,
        StageKind::ResolveError,
        StageKind::CheckAuthToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Initial => "initial",
            StageKind::GetFromCache => "get_from_cache",
            StageKind::GetFromNet => "get_from_net",
            StageKind::SaveToCache => "save_to_cache",
            StageKind::DeliverResult => "deliver_result",
            StageKind::DeliverError => "deliver_error",
            StageKind::ResolveError => "resolve_error",
            StageKind::CheckAuthToken => "check_auth_token",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
