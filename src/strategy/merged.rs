// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use super::{Decision, InvocationStrategy, StageKind, StrategyTable};

/// The effective strategy of one request: several tables folded into one.
///
/// Tables are applied in order, so a later table replaces an earlier table's entry for the
/// same stage, and a later metadata value replaces an earlier one with the same key.
/// Metadata stays mutable for the lifetime of the strategy so stages can flip flags.
pub struct MergedStrategy {
    label: String,
    algorithm: HashMap<StageKind, Decision>,
    metadata: Mutex<HashMap<String, String>>,
}

impl MergedStrategy {
    pub fn merge<I, T>(tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<StrategyTable>,
    {
        let mut names = Vec::new();
        let mut algorithm = HashMap::new();
        let mut metadata = HashMap::new();

        for table in tables {
            let table = table.into();
            names.push(table.name);
            algorithm.extend(table.algorithm);
            metadata.extend(table.metadata);
        }

        Self {
            label: names.join("+"),
            algorithm,
            metadata: Mutex::new(metadata),
        }
    }

    /// Strategy used by methods that declare none.
    pub fn fallback() -> Self {
        Self::merge([InvocationStrategy::NoCache])
    }

    /// Names of the merged tables joined with `+`, e.g. `priority_cache+retry_if_no_network`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn decision(&self, stage: StageKind) -> Option<&Decision> {
        self.algorithm.get(&stage)
    }

    /// Next stages after `stage` for the given outcome; empty when the table has no entry.
    pub fn next(&self, stage: StageKind, success: bool) -> Vec<StageKind> {
        self.algorithm
            .get(&stage)
            .map(|d| d.get(success).to_vec())
            .unwrap_or_default()
    }

    pub fn meta(&self, key: &str) -> Option<String> {
        self.lock_metadata().get(key).cloned()
    }

    pub fn meta_flag(&self, key: &str) -> bool {
        self.meta(key).map(|v| v == "true").unwrap_or(false)
    }

    /// Sets a metadata value; `None` removes the key.
    pub fn set_meta(&self, key: &str, value: Option<String>) {
        let mut metadata = self.lock_metadata();
        match value {
            Some(v) => {
                metadata.insert(key.to_string(), v);
            }
            None => {
                metadata.remove(key);
            }
        }
    }

    fn lock_metadata(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Metadata writes are single inserts, a poisoned guard still holds a consistent map.
        self.metadata.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for MergedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedStrategy")
            .field("label", &self.label)
            .field("stages", &self.algorithm.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::RETRY_NETWORK_ERROR_KEY;
    use InvocationStrategy::*;
    use StageKind::*;

    #[test]
    fn merges_presets_last_wins() {
        let strategy = MergedStrategy::merge([PriorityCache, AuthorizedRequest, RetryIfNoNetwork]);

        assert_eq!(strategy.next(Initial, true), vec![CheckAuthToken]);
        assert!(strategy.next(Initial, false).is_empty());
        assert_eq!(strategy.next(CheckAuthToken, true), vec![GetFromCache]);
        assert_eq!(strategy.next(CheckAuthToken, false), vec![DeliverError]);
        assert_eq!(strategy.next(GetFromCache, true), vec![DeliverResult]);
        assert_eq!(strategy.next(GetFromCache, false), vec![GetFromNet]);
        assert_eq!(strategy.meta(RETRY_NETWORK_ERROR_KEY).as_deref(), Some("true"));
        assert_eq!(
            strategy.label(),
            "priority_cache+authorized_request+retry_if_no_network"
        );
    }

    #[test]
    fn later_table_overrides_stage_entry_and_metadata() {
        let a = StrategyTable::new("a")
            .route(GetFromNet, Decision::either(DeliverResult, DeliverError))
            .route(Initial, Decision::to(GetFromNet))
            .meta("mode", "a")
            .meta("only_a", "1");
        let b = StrategyTable::new("b")
            .route(GetFromNet, Decision::either(SaveToCache, ResolveError))
            .meta("mode", "b");

        let strategy = MergedStrategy::merge([a, b]);

        assert_eq!(strategy.next(GetFromNet, true), vec![SaveToCache]);
        assert_eq!(strategy.next(GetFromNet, false), vec![ResolveError]);
        assert_eq!(strategy.next(Initial, true), vec![GetFromNet]);
        assert_eq!(strategy.meta("mode").as_deref(), Some("b"));
        assert_eq!(strategy.meta("only_a").as_deref(), Some("1"));
    }

    #[test]
    fn missing_stage_routes_nowhere() {
        let strategy = MergedStrategy::fallback();
        assert!(strategy.next(SaveToCache, true).is_empty());
        assert!(strategy.next(DeliverResult, false).is_empty());
    }

    #[test]
    fn metadata_is_mutable() {
        let strategy = MergedStrategy::fallback();
        assert!(!strategy.meta_flag("flag"));
        strategy.set_meta("flag", Some("true".into()));
        assert!(strategy.meta_flag("flag"));
        strategy.set_meta("flag", None);
        assert_eq!(strategy.meta("flag"), None);
    }
}
