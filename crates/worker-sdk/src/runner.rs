// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! The worker process's IPC loop: reads `ParentMessage` frames, dispatches
//! `call`s concurrently against the registry, and serializes every outgoing
//! `ChildMessage` through one writer task so frames never interleave.

use crate::context::ToolContext;
use crate::emitter::ProgressEmitter;
use crate::registry::ToolRegistry;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use wrkd_core::id::IdBuf;
use wrkd_wire::framing;
use wrkd_wire::worker_ipc::{ChildMessage, ParentMessage};
use wrkd_wire::ProtocolError;

/// Hard ceiling on a single call's execution time, regardless of progress.
/// The daemon extends its own wait on progress but never past this.
const HARD_CALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const CLIENT_CWD_KEY: &str = "_client_cwd";
const SESSION_MEMORY_KEY: &str = "_session_memory";

#[derive(Debug, Error)]
pub enum WorkerRunError {
    #[error("protocol error reading from parent: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Runs the worker loop over real stdin/stdout until `shutdown` or EOF.
pub async fn run_worker(registry: ToolRegistry) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    if let Err(err) = run_worker_with_io(registry, stdin, stdout).await {
        tracing::error!(error = %err, "worker IPC loop failed");
        std::process::exit(1);
    }
}

/// Same as [`run_worker`] but over injectable reader/writer, so the loop can
/// be driven in tests with in-memory pipes instead of a real process's stdio.
pub async fn run_worker_with_io<R, W>(registry: ToolRegistry, reader: R, writer: W) -> Result<(), WorkerRunError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ChildMessage>();
    let writer_task = tokio::spawn(writer_loop(writer, out_rx));

    let worker_id = IdBuf::new(&format!("work{}", nanoid::nanoid!(19)));
    let _ = out_tx.send(ChildMessage::Ready { worker_id: worker_id.as_str().to_string() });

    let result = read_loop(registry, reader, out_tx.clone()).await;

    drop(out_tx);
    let _ = writer_task.await;
    result
}

async fn writer_loop<W>(writer: W, mut rx: mpsc::UnboundedReceiver<ChildMessage>)
where
    W: AsyncWrite + Unpin,
{
    tokio::pin!(writer);
    while let Some(msg) = rx.recv().await {
        if let Err(err) = framing::write_message(&mut writer, &msg).await {
            tracing::warn!(error = %err, "failed to write child message, parent likely gone");
            break;
        }
    }
}

async fn read_loop<R>(
    registry: ToolRegistry,
    reader: R,
    out_tx: mpsc::UnboundedSender<ChildMessage>,
) -> Result<(), WorkerRunError>
where
    R: AsyncRead + Unpin,
{
    tokio::pin!(reader);
    loop {
        let msg: ParentMessage = match framing::read_message(&mut reader).await {
            Ok(msg) => msg,
            Err(ProtocolError::Eof) => return Ok(()),
            Err(err) => {
                let _ = out_tx.send(ChildMessage::Crash { error: err.to_string() });
                return Err(err.into());
            }
        };

        match msg {
            ParentMessage::Call { id, function_name, args } => {
                let registry = registry.clone();
                let out_tx = out_tx.clone();
                tokio::spawn(async move {
                    dispatch_call(&registry, id, function_name, args, out_tx).await;
                });
            }
            ParentMessage::Ping { id } => {
                let _ = out_tx.send(ChildMessage::Pong { id });
            }
            ParentMessage::Shutdown => return Ok(()),
        }
    }
}

async fn dispatch_call(
    registry: &ToolRegistry,
    id: String,
    function_name: String,
    mut args: Value,
    out_tx: mpsc::UnboundedSender<ChildMessage>,
) {
    let client_cwd = extract_string_field(&mut args, CLIENT_CWD_KEY);
    let session_memory = extract_field(&mut args, SESSION_MEMORY_KEY).unwrap_or(Value::Null);

    let Some(handler) = registry.get(&function_name) else {
        let _ = out_tx.send(ChildMessage::Error { id, error: format!("Unknown function: {function_name}") });
        return;
    };

    let deadline = Instant::now() + HARD_CALL_TIMEOUT;
    let progress = ProgressEmitter::new(id.clone(), out_tx.clone());
    let ctx = ToolContext::new(client_cwd, session_memory, progress, deadline);

    let outcome = tokio::time::timeout(HARD_CALL_TIMEOUT, run_handler_isolated(handler, args, ctx)).await;

    match outcome {
        Ok((result, memory)) => {
            let _ = out_tx.send(ChildMessage::MemoryUpdate { id: id.clone(), memory });
            match result {
                Ok(data) => {
                    let _ = out_tx.send(ChildMessage::Result { id, data });
                }
                Err(error) => {
                    let _ = out_tx.send(ChildMessage::Error { id, error });
                }
            }
        }
        Err(_) => {
            let _ = out_tx.send(ChildMessage::Error { id, error: "Function execution timeout".into() });
        }
    }
}

/// Runs `handler` off the async executor so a panic can be caught with
/// `catch_unwind` without poisoning the runtime, and returns the handler's
/// result alongside whatever the call left in session memory.
async fn run_handler_isolated(
    handler: crate::registry::ToolHandler,
    args: Value,
    ctx: ToolContext,
) -> (Result<Value, String>, Value) {
    tokio::task::spawn_blocking(move || {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(args, &ctx)))
            .unwrap_or_else(|panic| Err(panic_message(&panic)));
        (result, ctx.memory())
    })
    .await
    .unwrap_or_else(|join_err| (Err(format!("worker task panicked: {join_err}")), Value::Null))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool handler panicked".to_string()
    }
}

fn extract_field(args: &mut Value, key: &str) -> Option<Value> {
    args.as_object_mut().and_then(|obj| obj.remove(key))
}

fn extract_string_field(args: &mut Value, key: &str) -> Option<String> {
    extract_field(args, key).and_then(|v| v.as_str().map(str::to_owned))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
