// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! wrkd-adapters: process and filesystem adapters the daemon is built on top
//! of, kept behind traits so the daemon's own logic can be tested against
//! fakes instead of real subprocesses and real filesystem events.

pub mod fs_watch;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use fs_watch::{FsWatchError, FsWatcher, WatchEvent};
pub use worker::{WorkerAdapter, WorkerAdapterError, WorkerHandle, WorkerSpawnSpec};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerAdapter, FakeWorkerHandle};
