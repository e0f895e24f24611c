// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative method table and the typed client built on it.
//!
//! ```no_run
//! use rpc_taskflow::backends::stub::EchoTransport;
//! use rpc_taskflow::client::{MethodSpec, RpcClient};
//! use rpc_taskflow::engine::EngineBuilder;
//! use rpc_taskflow::strategy::InvocationStrategy;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), rpc_taskflow::errors::ClientError> {
//! let client = RpcClient::new(EngineBuilder::new().build(), Arc::new(EchoTransport::new()))
//!     .with_max_batch_size(5)
//!     .register(MethodSpec::scoped("user", "get").strategies([InvocationStrategy::PriorityCache]));
//!
//! let user: Value = client.call("user.get", &json!({"id": 7})).await?;
//! # Ok(())
//! # }
//! ```

mod method;
mod rpc_client;

pub use method::MethodSpec;
pub use rpc_client::RpcClient;
