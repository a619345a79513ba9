// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wrkd-worker-sdk: the harness every tool worker process links against.
//!
//! A tool is a small binary crate that builds a [`ToolRegistry`] and calls
//! [`run_worker`]. The harness owns the IPC loop, speaking the parent↔child
//! protocol from `wrkd-wire`: it sends `ready` once construction succeeds,
//! dispatches `call` frames concurrently with a 5-minute hard timeout and
//! panic isolation per call, answers `ping` with `pong`, and exits cleanly
//! on `shutdown`.

pub mod context;
pub mod emitter;
pub mod registry;
pub mod runner;

pub use context::ToolContext;
pub use emitter::ProgressEmitter;
pub use registry::{ToolHandler, ToolRegistry};
pub use runner::{run_worker, run_worker_with_io, WorkerRunError};
