// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wrkd-core: shared primitives for the worker RPC runtime (ids).

pub mod id;

pub use id::{short, IdBuf};
