// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod request;
mod rpc;

pub use config::{ConfigError, ValidationError};
pub use request::{ClientError, RequestBuildError};
pub use rpc::{ErrorKind, RpcError, RpcErrorResponse, TransportError};
