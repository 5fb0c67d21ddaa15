// sardine-rs: GitSardine Repository Manager - Rust Port
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! I/O streaming and output capture for processes.
//!
//! ```text
//! run_child()
//!   stdin task (optional, closed after write)
//!   stdout/stderr reader tasks --> bytes --> lossy String each
//!   wait, or kill on timeout
//!   --> ProcessOutput { stdout, stderr, exit_code, timed_out }
//! ```
//!
//! Each reader task owns its buffer and hands it back through its
//! `JoinHandle`, so a chatty child never blocks on a full channel while the
//! parent is still waiting for it to exit.

use crate::error::Result;
use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use super::builder::{ProcessBuilder, ProcessOutput, StreamFlags};

/// Spawns a reader task for one stream if its flags need the content.
fn spawn_reader<R>(
    stream: Option<R>,
    flags: StreamFlags,
    process_name: &str,
    stream_name: &'static str,
) -> Option<JoinHandle<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    if !flags.intersects(StreamFlags::FORWARD_TO_LOG | StreamFlags::KEEP_IN_STRING) {
        return None;
    }
    let name = process_name.to_string();
    stream.map(|stream| tokio::spawn(async move { read_stream(stream, flags, &name, stream_name).await }))
}

async fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

impl ProcessBuilder {
    /// Runs the child process, handling I/O streaming and waiting for completion.
    pub(super) async fn run_child(&self, name: &str, child: &mut Child) -> Result<ProcessOutput> {
        let stdout_handle = spawn_reader(child.stdout.take(), self.stdout_config(), name, "stdout");
        let stderr_handle = spawn_reader(child.stderr.take(), self.stderr_config(), name, "stderr");

        self.write_stdin(name, child).await?;

        let (exit_status, timed_out) = if let Some(timeout_duration) = self.timeout_duration() {
            tokio::select! {
                status = child.wait() => (status?, false),
                () = tokio::time::sleep(timeout_duration) => {
                    warn!(process = %name, timeout = ?timeout_duration, "process timed out");
                    child.kill().await.with_context(|| format!("failed to kill process {name}"))?;
                    (child.wait().await?, true)
                }
            }
        } else {
            (child.wait().await?, false)
        };

        // A killed git may leave an ssh grandchild holding the pipes open.
        if timed_out {
            for handle in [&stdout_handle, &stderr_handle].into_iter().flatten() {
                handle.abort();
            }
        }
        let stdout = join_reader(stdout_handle).await;
        let stderr = join_reader(stderr_handle).await;

        Ok(ProcessOutput::new(
            exit_status.code().unwrap_or(-1),
            stdout,
            stderr,
            timed_out,
        ))
    }

    /// Writes stdin content to the child process if configured.
    ///
    /// The pipe is dropped afterwards so the child sees end of input.
    async fn write_stdin(&self, name: &str, child: &mut Child) -> Result<()> {
        if let Some(stdin_content) = self.stdin_content()
            && let Some(mut stdin) = child.stdin.take()
        {
            use tokio::io::AsyncWriteExt;
            stdin
                .write_all(stdin_content.as_bytes())
                .await
                .with_context(|| format!("failed to write to stdin for process {name}"))?;
        }
        Ok(())
    }
}

/// Reads a stream to the end, logging and/or keeping its content.
///
/// Output is collected as raw bytes and decoded lossily, so non-UTF-8 text
/// and `\r\n` endings survive.
async fn read_stream<R>(
    mut reader: R,
    flags: StreamFlags,
    process_name: &str,
    stream_name: &str,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes).await {
        warn!(
            process = %process_name,
            stream = %stream_name,
            error = %e,
            "error reading stream"
        );
    }
    let text = String::from_utf8_lossy(&bytes);

    if flags.contains(StreamFlags::FORWARD_TO_LOG) {
        for line in text.lines() {
            trace!(process = %process_name, stream = %stream_name, line = %line, "output");
        }
    }
    if flags.contains(StreamFlags::KEEP_IN_STRING) {
        text.into_owned()
    } else {
        String::new()
    }
}
