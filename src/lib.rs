// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // collaborator implementations and stub transports
pub mod blocks;     // built-in stage blocks
pub mod client;     // method table + typed client
pub mod config;     // config loading, validation, runtime builder
pub mod engine;     // task-flow engine
pub mod errors;     // error handling
pub mod observability;
pub mod rpc;        // JSON-RPC bodies and request descriptors
pub mod strategy;   // stages and routing tables
pub mod traits;     // unified abstractions
