// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// Errors that can occur during method table validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A method references a strategy that is neither a preset nor defined in the config
    UnknownStrategy {
        /// The method declaring the strategy
        method: String,
        /// The strategy name that couldn't be resolved
        strategy: String,
    },
    /// Two method entries resolve to the same RPC method name
    DuplicateMethod {
        /// The duplicated method name
        method: String,
    },
    /// A batch size of zero would starve every task on the transport
    InvalidBatchSize {
        /// The configured value
        max_batch_size: usize,
    },
    /// The merged strategy has no route out of the Initial stage
    NoInitialRoute {
        /// The method whose strategy is incomplete
        method: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownStrategy { method, strategy } => {
                write!(
                    f,
                    "Method '{}' uses strategy '{}' which does not exist",
                    method, strategy
                )
            }
            ValidationError::DuplicateMethod { method } => {
                write!(f, "Duplicate method: '{}'", method)
            }
            ValidationError::InvalidBatchSize { max_batch_size } => {
                write!(f, "max_batch_size must be at least 1, got {}", max_batch_size)
            }
            ValidationError::NoInitialRoute { method } => {
                write!(
                    f,
                    "Method '{}' has a strategy without a route out of the initial stage",
                    method
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format: '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
