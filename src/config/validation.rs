// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Method table validation.
//!
//! Checks run in order and accumulate, so a config with several problems reports all
//! of them at once:
//!
//! 1. **Batch size**: `client.max_batch_size` must be at least 1
//! 2. **Uniqueness**: no two entries resolve to the same RPC method name
//! 3. **Strategy references**: every strategy name is a preset or a custom table
//! 4. **Routing**: every method's merged strategy leaves the initial stage
//!
//! The routing check only runs for methods whose strategy names all resolved.
//!
//! # Examples
//!
//! ```rust
//! use rpc_taskflow::config::{validate_config, Config};
//! use rpc_taskflow::errors::ValidationError;
//!
//! let config: Config = serde_yaml::from_str(r#"
//! methods:
//!   - name: user.get
//!     strategies: [priority_cache, nope]
//! "#).unwrap();
//!
//! let errors = validate_config(&config).unwrap_err();
//! assert!(matches!(
//!     &errors[0],
//!     ValidationError::UnknownStrategy { strategy, .. } if strategy == "nope"
//! ));
//! ```

use std::collections::HashSet;

use crate::config::Config;
use crate::errors::ValidationError;
use crate::observability::messages::validation::{
    ValidationCompleted, ValidationFailed, ValidationProblem, ValidationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::strategy::{MergedStrategy, StageKind};

/// Validates a configuration's method table.
///
/// # Returns
///
/// * `Ok(())` - Every method can be turned into a working descriptor
/// * `Err(Vec<ValidationError>)` - Every problem found
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    ValidationStarted {
        method_count: config.methods.len(),
        strategy_count: config.strategies.len(),
    }
    .log();

    let mut errors = Vec::new();

    let max_batch_size = config.client.max_batch_size();
    if max_batch_size == 0 {
        errors.push(ValidationError::InvalidBatchSize { max_batch_size });
    }

    errors.extend(validate_unique_methods(config));
    errors.extend(validate_strategies(config));

    if errors.is_empty() {
        ValidationCompleted {
            method_count: config.methods.len(),
        }
        .log();
        Ok(())
    } else {
        for error in &errors {
            ValidationProblem { problem: error }.log();
        }
        ValidationFailed {
            error_count: errors.len(),
        }
        .log();
        Err(errors)
    }
}

fn validate_unique_methods(config: &Config) -> Vec<ValidationError> {
    let scope = config.client.scope.as_deref();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for method in &config.methods {
        let name = method.full_name(scope);
        if !seen.insert(name.clone()) {
            errors.push(ValidationError::DuplicateMethod { method: name });
        }
    }

    errors
}

fn validate_strategies(config: &Config) -> Vec<ValidationError> {
    let scope = config.client.scope.as_deref();
    let mut errors = Vec::new();

    for method in &config.methods {
        let name = method.full_name(scope);
        let mut tables = Vec::new();
        let mut resolved = true;

        for strategy in &method.strategies {
            match config.resolve_strategy(strategy) {
                Some(table) => tables.push(table),
                None => {
                    resolved = false;
                    errors.push(ValidationError::UnknownStrategy {
                        method: name.clone(),
                        strategy: strategy.clone(),
                    });
                }
            }
        }

        if resolved && !tables.is_empty() {
            let merged = MergedStrategy::merge(tables);
            if merged.next(StageKind::Initial, true).is_empty() {
                errors.push(ValidationError::NoInitialRoute { method: name });
            }
        }
    }

    errors
}
