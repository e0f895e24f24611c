// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in invocation blocks, one per stage.
//!
//! | Stage            | Block                | Dispatch        |
//! |------------------|----------------------|-----------------|
//! | initial          | `InitialBlock`       | immediate       |
//! | check_auth_token | `CheckAuthBlock`     | immediate       |
//! | get_from_cache   | `GetFromCacheBlock`  | immediate       |
//! | get_from_net     | `GetFromNetBlock`    | time threshold  |
//! | save_to_cache    | `SaveToCacheBlock`   | immediate       |
//! | deliver_result   | `DeliverResultBlock` | immediate       |
//! | deliver_error    | `DeliverErrorBlock`  | immediate       |
//! | resolve_error    | `ResolveErrorBlock`  | immediate       |
//!
//! Any of them can be replaced through
//! [`EngineBuilder::with_block`](crate::engine::EngineBuilder::with_block).

pub mod cache;
pub mod deliver;
pub mod net;
pub mod passthrough;
pub mod resolve_error;

pub use cache::{GetFromCacheBlock, SaveToCacheBlock};
pub use deliver::{DeliverErrorBlock, DeliverResultBlock};
pub use net::GetFromNetBlock;
pub use passthrough::{CheckAuthBlock, InitialBlock};
pub use resolve_error::ResolveErrorBlock;
