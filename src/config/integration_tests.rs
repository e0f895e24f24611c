#[cfg(test)]
mod integration_tests {
    use crate::backends::stub::EchoTransport;
    use crate::config::{load_and_validate_config, ConversionKind, RuntimeBuilder};
    use crate::rpc::HttpMethod;
    use crate::strategy::StageKind;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    /// The YAML demo config loads and validates
    #[test]
    fn test_demo_yaml_loading() {
        let config = load_and_validate_config("configs/demo.yaml").unwrap();

        assert_eq!(config.engine.batch_window(), Duration::from_millis(50));
        assert_eq!(config.engine.max_network_retries(), 1);
        assert_eq!(config.client.max_batch_size(), 5);
        assert_eq!(config.methods.len(), 4);
        assert_eq!(config.methods[0].full_name(Some("user")), "user.get");
        assert_eq!(config.methods[3].full_name(Some("user")), "ping");
        assert_eq!(config.methods[3].http_method, HttpMethod::Get);
        assert_eq!(config.methods[1].default_params["limit"], json!(20));
    }

    /// YAML and TOML renditions of the demo describe the same table
    #[test]
    fn test_demo_toml_matches_yaml() {
        let yaml = load_and_validate_config("configs/demo.yaml").unwrap();
        let toml = load_and_validate_config("configs/demo.toml").unwrap();

        assert_eq!(yaml.methods.len(), toml.methods.len());
        for (y, t) in yaml.methods.iter().zip(toml.methods.iter()) {
            assert_eq!(y.name, t.name);
            assert_eq!(y.strategies, t.strategies);
            assert_eq!(y.bindable, t.bindable);
            assert_eq!(y.no_batch, t.no_batch);
            assert_eq!(y.conversion, ConversionKind::Default);
            assert_eq!(t.conversion, ConversionKind::Default);
        }
        assert_eq!(
            yaml.resolve_strategy("fail_fast"),
            toml.resolve_strategy("fail_fast")
        );
    }

    /// Building the runtime registers every method with its merged strategy
    #[tokio::test]
    async fn test_build_runtime_from_yaml() {
        let config = load_and_validate_config("configs/demo.yaml").unwrap();
        let (engine, client) =
            RuntimeBuilder::from_config(&config, Arc::new(EchoTransport::new())).unwrap();

        assert_eq!(client.methods().count(), 4);

        let get = client.method("user.get").unwrap();
        assert_eq!(get.strategy().label(), "priority_cache+retry_if_no_network");
        assert!(get.strategy().meta_flag("retry_network_error"));

        let update = client.method("user.update").unwrap();
        assert_eq!(
            update.strategy().next(StageKind::GetFromNet, false),
            vec![StageKind::DeliverError]
        );
        assert!(update.is_no_batch());

        engine.shutdown();
    }

    /// A configured client answers calls end to end
    #[tokio::test(start_paused = true)]
    async fn test_configured_client_calls() {
        let config = load_and_validate_config("configs/demo.yaml").unwrap();
        let transport = Arc::new(EchoTransport::new());
        let (engine, client) = RuntimeBuilder::from_config(&config, transport.clone()).unwrap();

        let listed = client.call_value("user.list", json!({"offset": 0})).await.unwrap();
        assert_eq!(listed, json!({"limit": 20, "offset": 0}));

        let pong = client.call_value("ping", serde_json::Value::Null).await.unwrap();
        assert_eq!(pong, json!({"applicationMethod": "ping"}));

        assert_eq!(transport.call_count(), 2);
        engine.shutdown();
    }
}
