// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Adapter for spawning and talking to a tool worker process.
//!
//! `WorkerAdapter` abstracts "start a child process and exchange
//! length-prefixed JSON frames with it over stdin/stdout" so the daemon's
//! `WorkerManager` can be exercised against [`crate::fake::FakeWorkerAdapter`]
//! in tests without spawning real processes. Spawning returns a sender and
//! a receiver half rather than one handle, so a manager can own a
//! dedicated write path and a dedicated read loop concurrently without
//! fighting over a single `&mut`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use wrkd_wire::framing;
use wrkd_wire::worker_ipc::{ChildMessage, ParentMessage};

#[derive(Debug, Error)]
pub enum WorkerAdapterError {
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(String),
    #[error("worker IPC error: {0}")]
    Protocol(#[from] wrkd_wire::ProtocolError),
    #[error("worker process exited")]
    Exited,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to spawn one worker process.
#[derive(Debug, Clone)]
pub struct WorkerSpawnSpec {
    pub namespace: String,
    /// Path to the worker binary (built from the tool's manifest).
    pub binary_path: PathBuf,
    /// Working directory the worker process starts in.
    pub cwd: PathBuf,
}

/// Write half of a live worker connection; also owns process control.
#[async_trait]
pub trait WorkerSender: Send {
    async fn send(&mut self, msg: &ParentMessage) -> Result<(), WorkerAdapterError>;
    async fn kill(&mut self) -> Result<(), WorkerAdapterError>;
    fn pid(&self) -> Option<u32>;
}

/// Read half of a live worker connection.
#[async_trait]
pub trait WorkerReceiver: Send {
    async fn recv(&mut self) -> Result<ChildMessage, WorkerAdapterError>;
}

/// Spawns worker processes and hands back sender/receiver halves for each.
#[async_trait]
pub trait WorkerAdapter: Send + Sync + 'static {
    async fn spawn(
        &self,
        spec: WorkerSpawnSpec,
    ) -> Result<(Box<dyn WorkerSender>, Box<dyn WorkerReceiver>), WorkerAdapterError>;
}

/// Real adapter: spawns an OS process with piped stdio.
#[derive(Debug, Clone, Default)]
pub struct ProcessWorkerAdapter;

#[async_trait]
impl WorkerAdapter for ProcessWorkerAdapter {
    async fn spawn(
        &self,
        spec: WorkerSpawnSpec,
    ) -> Result<(Box<dyn WorkerSender>, Box<dyn WorkerReceiver>), WorkerAdapterError> {
        let mut cmd = Command::new(&spec.binary_path);
        cmd.current_dir(&spec.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| WorkerAdapterError::SpawnFailed(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerAdapterError::SpawnFailed("missing stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerAdapterError::SpawnFailed("missing stdout".into()))?;

        let pid = child.id();
        let sender = ProcessWorkerSender { child, stdin: BufWriter::new(stdin), pid };
        let receiver = ProcessWorkerReceiver { stdout: BufReader::new(stdout) };
        Ok((Box::new(sender), Box::new(receiver)))
    }
}

struct ProcessWorkerSender {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    pid: Option<u32>,
}

#[async_trait]
impl WorkerSender for ProcessWorkerSender {
    async fn send(&mut self, msg: &ParentMessage) -> Result<(), WorkerAdapterError> {
        framing::write_message(&mut self.stdin, msg).await?;
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), WorkerAdapterError> {
        self.child.start_kill()?;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

struct ProcessWorkerReceiver {
    stdout: BufReader<ChildStdout>,
}

#[async_trait]
impl WorkerReceiver for ProcessWorkerReceiver {
    async fn recv(&mut self) -> Result<ChildMessage, WorkerAdapterError> {
        match framing::read_message(&mut self.stdout).await {
            Ok(msg) => Ok(msg),
            Err(wrkd_wire::ProtocolError::Eof) => Err(WorkerAdapterError::Exited),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
