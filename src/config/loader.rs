// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::conversion::{DefaultConversion, InnerErrorConversion, InnerResultConversion};
use crate::config::consts::{
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_NETWORK_RETRIES, DEFAULT_QUEUE_TIME_THRESHOLD,
};
use crate::errors::{ConfigError, ValidationError};
use crate::rpc::HttpMethod;
use crate::strategy::{InvocationStrategy, StrategyTable};
use crate::traits::ConversionStrategy;

/// Main configuration structure of an RPC client.
///
/// Describes the engine's scheduling options, client-wide defaults, custom strategy tables
/// and the method table. It is loaded from a YAML or TOML file.
///
/// # Fields
/// * `engine` - Batching window and retry budget of the engine (optional)
/// * `client` - Client-wide batch size and default method scope (optional)
/// * `strategies` - Named custom strategy tables, usable next to the presets (optional)
/// * `methods` - The method table
///
/// # Example
/// ```yaml
/// engine:
///   batch_window_ms: 50
/// client:
///   max_batch_size: 5
///   scope: user
/// strategies:
///   fail_fast:
///     algorithm:
///       get_from_net: { on_success: [deliver_result], on_failure: [deliver_error] }
/// methods:
///   - name: get
///     strategies: [priority_cache, retry_if_no_network]
///     cache_expires_after_ms: 60000
///   - name: update
///     strategies: [no_cache, fail_fast]
///     bindable: false
///     no_batch: true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineOptions,
    #[serde(default)]
    pub client: ClientOptions,
    #[serde(default)]
    pub strategies: HashMap<String, StrategyTable>,
    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

impl Config {
    /// Custom table named `name`, or the preset with that name.
    pub fn resolve_strategy(&self, name: &str) -> Option<StrategyTable> {
        if let Some(custom) = self.strategies.get(name) {
            let mut table = custom.clone();
            table.name = name.to_string();
            return Some(table);
        }
        InvocationStrategy::from_str(name).ok().map(StrategyTable::from)
    }

    /// Strategy tables of `method` in declaration order.
    pub fn method_strategies(&self, method: &MethodConfig) -> Result<Vec<StrategyTable>, ValidationError> {
        method
            .strategies
            .iter()
            .map(|name| {
                self.resolve_strategy(name)
                    .ok_or_else(|| ValidationError::UnknownStrategy {
                        method: method.full_name(self.client.scope.as_deref()),
                        strategy: name.clone(),
                    })
            })
            .collect()
    }
}

/// Scheduling options of the engine.
#[derive(Debug, Default, Deserialize)]
pub struct EngineOptions {
    pub batch_window_ms: Option<u64>,
    pub max_network_retries: Option<usize>,
}

impl EngineOptions {
    pub fn batch_window(&self) -> Duration {
        self.batch_window_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUEUE_TIME_THRESHOLD)
    }

    pub fn max_network_retries(&self) -> usize {
        self.max_network_retries.unwrap_or(DEFAULT_MAX_NETWORK_RETRIES)
    }
}

/// Client-wide defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ClientOptions {
    pub max_batch_size: Option<usize>,
    /// Scope prefixed to methods that declare none.
    pub scope: Option<String>,
}

impl ClientOptions {
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE)
    }
}

/// Envelope strategy of a method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    #[default]
    Default,
    InnerResult,
    InnerError,
}

impl ConversionKind {
    pub fn strategy(&self) -> Arc<dyn ConversionStrategy> {
        match self {
            ConversionKind::Default => Arc::new(DefaultConversion),
            ConversionKind::InnerResult => Arc::new(InnerResultConversion),
            ConversionKind::InnerError => Arc::new(InnerErrorConversion),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One entry of the method table.
#[derive(Debug, Deserialize)]
pub struct MethodConfig {
    pub name: String,
    pub scope: Option<String>,
    #[serde(default)]
    pub http_method: HttpMethod,
    #[serde(default)]
    pub strategies: Vec<String>,
    pub cache_expires_after_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub bindable: bool,
    #[serde(default)]
    pub no_batch: bool,
    #[serde(default)]
    pub conversion: ConversionKind,
    #[serde(default)]
    pub default_params: Map<String, Value>,
}

impl MethodConfig {
    /// RPC method name: `scope.name` with the method's own scope, else the default scope.
    pub fn full_name(&self, default_scope: Option<&str>) -> String {
        let scope = self.scope.as_deref().or(default_scope).unwrap_or("");
        crate::client::MethodSpec::qualified_name(scope, &self.name)
    }
}

/// Loads a configuration file; the extension selects YAML (`.yaml`, `.yml`) or TOML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}

pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StageKind;
    use std::io::Write;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
client:
  max_batch_size: 5
  scope: user
methods:
  - name: get
    strategies: [priority_cache]
  - name: ping
    scope: ""
    bindable: false
    no_batch: true
    http_method: get
"#;

        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.client.max_batch_size(), 5);
        assert_eq!(cfg.engine.batch_window(), DEFAULT_QUEUE_TIME_THRESHOLD);
        assert_eq!(cfg.methods.len(), 2);
        assert_eq!(cfg.methods[0].full_name(Some("user")), "user.get");
        assert!(cfg.methods[0].bindable);
        assert_eq!(cfg.methods[1].full_name(Some("user")), "ping");
        assert!(!cfg.methods[1].bindable);
        assert_eq!(cfg.methods[1].http_method, HttpMethod::Get);
    }

    #[test]
    fn custom_strategy_tables_parse() {
        let yaml = r#"
strategies:
  fail_fast:
    algorithm:
      initial: { on_success: [get_from_net] }
      get_from_net: { on_success: [deliver_result], on_failure: [deliver_error] }
    metadata:
      owner: billing
methods:
  - name: pay
    strategies: [fail_fast, retry_if_no_network]
"#;

        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let tables = cfg.method_strategies(&cfg.methods[0]).unwrap();
        assert_eq!(tables[0].name, "fail_fast");
        assert_eq!(
            tables[0].algorithm[&StageKind::GetFromNet].on_failure,
            vec![StageKind::DeliverError]
        );
        assert_eq!(tables[0].metadata["owner"], "billing");
        assert_eq!(tables[1].name, "retry_if_no_network");
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let yaml = r#"
methods:
  - name: pay
    strategies: [does_not_exist]
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.method_strategies(&cfg.methods[0]).unwrap_err(),
            ValidationError::UnknownStrategy {
                method: "pay".into(),
                strategy: "does_not_exist".into()
            }
        );
    }

    #[test]
    fn loads_toml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[engine]
batch_window_ms = 25

[[methods]]
name = "user.get"
strategies = ["priority_cache"]
conversion = "inner_result"

[methods.default_params]
lang = "en"
"#
        )
        .unwrap();

        let cfg = load_and_validate_config(file.path()).unwrap();
        assert_eq!(cfg.engine.batch_window(), Duration::from_millis(25));
        assert_eq!(cfg.methods[0].conversion, ConversionKind::InnerResult);
        assert_eq!(cfg.methods[0].default_params["lang"], "en");
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "json"
        ));
    }

    #[test]
    fn invalid_config_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
client:
  max_batch_size: 0
methods:
  - name: a
  - name: a
"#
        )
        .unwrap();

        let err = load_and_validate_config(file.path()).unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }
}
