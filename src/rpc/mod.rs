// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Request bodies and request descriptors.

mod descriptor;
mod request;

pub use descriptor::{DescriptorBuilder, HttpMethod, RequestDescriptor, ResultType};
pub(crate) use descriptor::same_instance;
pub use request::RpcRequest;
