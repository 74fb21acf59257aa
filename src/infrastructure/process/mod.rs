//! External encoder execution with streamed diagnostics and cancellation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::error::{TranscodeError, TranscodeResult};

/// Runs one external program to completion.
///
/// Implementations fail with [`TranscodeError::ExecutionFailed`] on spawn
/// errors or a non-zero exit, and with [`TranscodeError::Canceled`] when
/// `cancel` fires first. They return only once the process has exited.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> TranscodeResult<()>;
}

pub struct EncoderProcessRunner {
    kill_grace: Duration,
}

impl EncoderProcessRunner {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }

    /// Asks the process tree to stop, then kills it if it outlives the grace period.
    async fn terminate(&self, child: &mut Child, program: &str) {
        request_stop(child);

        match tokio::time::timeout(self.kill_grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!(program, %status, "Encoder stopped after cancellation");
            }
            Ok(Err(e)) => {
                warn!(program, "Failed waiting for encoder to stop: {}", e);
                force_kill(child).await;
            }
            Err(_) => {
                warn!(
                    program,
                    grace_ms = self.kill_grace.as_millis() as u64,
                    "Encoder ignored termination request, killing process tree"
                );
                force_kill(child).await;
            }
        }
    }

    /// Waits for the output forwarders for at most the grace period. A
    /// leftover group member may keep the pipes open after the child exits.
    async fn drain_output(&self, forwarders: Vec<JoinHandle<()>>, program: &str) {
        let aborts: Vec<_> = forwarders.iter().map(JoinHandle::abort_handle).collect();

        if tokio::time::timeout(self.kill_grace, join_all(forwarders))
            .await
            .is_err()
        {
            warn!(program, "Output pipes still open after exit, detaching log forwarders");
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for EncoderProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> TranscodeResult<()> {
        let program_name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string_lossy().to_string());

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            TranscodeError::execution_failed(&program_name, format!("failed to spawn: {e}"))
        })?;

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_lines(stdout, program_name.clone(), "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_lines(stderr, program_name.clone(), "stderr"));
        }

        let exit = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let result = match exit {
            Some(Ok(status)) if status.success() => Ok(()),
            Some(Ok(status)) => Err(TranscodeError::execution_failed(
                &program_name,
                format!("exited with {status}"),
            )),
            Some(Err(e)) => Err(TranscodeError::execution_failed(
                &program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            None => {
                self.terminate(&mut child, &program_name).await;
                Err(TranscodeError::Canceled)
            }
        };

        self.drain_output(forwarders, &program_name).await;

        result
    }
}

fn forward_lines<R>(reader: R, program: String, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    info!(program = %program, stream, "{}", line);
                }
            }
        }
        .in_current_span(),
    )
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => killpg(Pid::from_raw(pid as i32), signal).is_ok(),
        None => false,
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    if !signal_group(child, nix::sys::signal::Signal::SIGTERM) {
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.start_kill();
}

async fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    signal_group(child, nix::sys::signal::Signal::SIGKILL);

    let _ = child.start_kill();
    let _ = child.wait().await;
}
