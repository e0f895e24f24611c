// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for building request descriptors out of the method table.

use thiserror::Error;

use super::RpcError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestBuildError {
    /// The method is not present in the client's method table.
    #[error("Method '{0}' is not registered")]
    UnknownMethod(String),

    /// Named parameters were added after a whole-body parameter.
    #[error("The body already has been set")]
    BodyAlreadySet,

    /// A whole-body parameter was set after named parameters.
    #[error("The params already have been set")]
    ParamsAlreadySet,

    /// Call arguments could not be serialized into the request body.
    #[error("Failed to serialize parameters for '{method}': {reason}")]
    InvalidParams { method: String, reason: String },
}

/// Failure of a typed client call: the request could not be built, or it failed in flight.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error(transparent)]
    Build(#[from] RequestBuildError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ClientError {
    /// The in-flight failure, if the request got that far.
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            ClientError::Rpc(error) => Some(error),
            ClientError::Build(_) => None,
        }
    }
}
