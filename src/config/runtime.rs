// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use crate::client::{MethodSpec, RpcClient};
use crate::config::{validate_config, Config, MethodConfig};
use crate::engine::{Engine, EngineBuilder};
use crate::errors::ConfigError;
use crate::traits::Transport;

/// Runtime builder: turns a configuration into a running engine and a client bound to it.
///
/// # Examples
///
/// ```no_run
/// use rpc_taskflow::backends::stub::EchoTransport;
/// use rpc_taskflow::config::{load_config, RuntimeBuilder};
/// use std::sync::Arc;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("configs/demo.yaml")?;
/// let (engine, client) = RuntimeBuilder::from_config(&config, Arc::new(EchoTransport::new()))?;
///
/// let user = client.call_value("user.get", serde_json::json!({"id": 7})).await?;
/// engine.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Builds the engine with default collaborators.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_config(
        cfg: &Config,
        transport: Arc<dyn Transport>,
    ) -> Result<(Engine, RpcClient), ConfigError> {
        Self::from_config_with(cfg, transport, EngineBuilder::new())
    }

    /// Builds the engine from `builder`, overriding its window and retry budget with the
    /// configured values.
    pub fn from_config_with(
        cfg: &Config,
        transport: Arc<dyn Transport>,
        builder: EngineBuilder,
    ) -> Result<(Engine, RpcClient), ConfigError> {
        validate_config(cfg).map_err(ConfigError::Invalid)?;

        let specs = cfg
            .methods
            .iter()
            .map(|method| Self::method_spec(cfg, method))
            .collect::<Result<Vec<_>, _>>()?;

        let engine = builder
            .batch_window(cfg.engine.batch_window())
            .max_network_retries(cfg.engine.max_network_retries())
            .build();

        let client = specs.into_iter().fold(
            RpcClient::new(engine.clone(), transport).with_max_batch_size(cfg.client.max_batch_size()),
            RpcClient::register,
        );

        Ok((engine, client))
    }

    fn method_spec(cfg: &Config, method: &MethodConfig) -> Result<MethodSpec, ConfigError> {
        let tables = cfg
            .method_strategies(method)
            .map_err(|e| ConfigError::Invalid(vec![e]))?;

        let mut spec = MethodSpec::new(method.full_name(cfg.client.scope.as_deref()))
            .http_method(method.http_method)
            .strategies(tables)
            .conversion(method.conversion.strategy());

        if let Some(ms) = method.cache_expires_after_ms {
            spec = spec.expires_after(Duration::from_millis(ms));
        }
        if !method.bindable {
            spec = spec.not_bindable();
        }
        if method.no_batch {
            spec = spec.no_batch();
        }
        for (name, value) in &method.default_params {
            spec = spec.default_param(name.clone(), value.clone());
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::EchoTransport;

    #[tokio::test]
    async fn registers_every_method() {
        let config: Config = serde_yaml::from_str(
            r#"
client:
  max_batch_size: 3
  scope: user
methods:
  - name: get
    strategies: [priority_cache]
    cache_expires_after_ms: 1000
  - name: update
    bindable: false
    no_batch: true
"#,
        )
        .unwrap();

        let (engine, client) =
            RuntimeBuilder::from_config(&config, Arc::new(EchoTransport::new())).unwrap();

        assert_eq!(client.methods().count(), 2);
        let get = client.method("user.get").unwrap();
        assert_eq!(get.expiry(), Duration::from_secs(1));
        assert_eq!(get.strategy().label(), "priority_cache");
        assert!(!client.method("user.update").unwrap().is_bindable());
        engine.shutdown();
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let config: Config = serde_yaml::from_str("methods:\n  - name: a\n    strategies: [zzz]\n").unwrap();
        let result = RuntimeBuilder::from_config(&config, Arc::new(EchoTransport::new()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
