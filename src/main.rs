// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use rpc_taskflow::backends::stub::EchoTransport;
use rpc_taskflow::config::{load_and_validate_config, RuntimeBuilder};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rpc_taskflow=info")),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <config.yaml|config.toml> <method> [params-json] [repeat]", args[0]);
        eprintln!("Example: {} configs/demo.yaml user.get '{{\"id\": 7}}'", args[0]);
        eprintln!("Example: {} configs/demo.toml user.list '{{\"offset\": 0}}' 8", args[0]);
        std::process::exit(1);
    }

    let config_file = &args[1];
    let method = &args[2];
    let params: Value = match args.get(3) {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("params are not JSON: {}", raw))?,
        None => Value::Null,
    };
    let repeat: usize = match args.get(4) {
        Some(raw) => raw.parse().with_context(|| format!("repeat is not a number: {}", raw))?,
        None => 1,
    };

    let config = load_and_validate_config(config_file)
        .with_context(|| format!("loading {}", config_file))?;
    let transport = Arc::new(EchoTransport::new());
    let (engine, client) = RuntimeBuilder::from_config(&config, transport.clone())?;

    if client.method(method).is_none() {
        bail!("method '{}' is not declared in {}", method, config_file);
    }

    println!("🚀 RPC Task Flow Demo");
    println!("═════════════════════");
    println!("📋 Configuration: {}", config_file);
    println!("🔧 Method: {} (x{})", method, repeat);
    println!("📦 Max Batch Size: {}", config.client.max_batch_size());
    println!("⏱️  Batch Window: {:?}", config.engine.batch_window());
    println!();

    let start = Instant::now();
    let mut handles = Vec::with_capacity(repeat);
    for _ in 0..repeat {
        handles.push(client.submit(method, &params).await?);
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let task_id = handle.task_id();
        match handle.result().await {
            Ok(value) => println!("  {}. task {} → {}", i + 1, task_id, value),
            Err(e) => println!("  {}. task {} ❌ {}", i + 1, task_id, e),
        }
    }

    println!();
    println!("🔢 Wire Calls: {}", transport.call_count());
    println!("📊 Batch Sizes: {:?}", transport.batch_sizes());
    println!("⏱️  Total Time: {:?}", start.elapsed());

    engine.shutdown();
    Ok(())
}
