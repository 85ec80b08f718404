//! Timed subprocess execution with line-streamed output

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Receives captured output lines as they arrive, so operators can follow
/// a long run in real time.
pub trait OutputSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Production sink: forwards every line to the `certbot` log target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, line: &str) {
        info!(target: "certbot", "{}", line);
    }
}

/// What a finished process reported.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Exit code, `-1` when the process died without one
    pub exit_code: i32,
    /// Combined stdout and stderr lines in arrival order
    pub output: String,
}

/// Runner faults. A non-zero exit code is not a fault; it comes back in
/// the outcome for the caller to judge.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Cannot spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command did not finish before the deadline")]
    TimedOut { output: String },

    #[error("Failed waiting for the command: {0}")]
    Wait(#[from] std::io::Error),
}

/// Executes an argv with a deadline, streaming output to a sink.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        sink: Arc<dyn OutputSink>,
    ) -> Result<CommandOutcome, CommandError>;
}

/// Runner backed by `tokio::process`. The argv goes to the OS verbatim,
/// no shell in between, and stdin is closed.
#[derive(Debug, Default)]
pub struct TokioCommandRunner;

/// How long the pipe readers get to flush after a timeout kill. Kill only
/// reaches the direct child; a surviving grandchild holding the pipe write
/// ends must not stretch the deadline.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(1);

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        sink: Arc<dyn OutputSink>,
    ) -> Result<CommandOutcome, CommandError> {
        let (program, args) = argv.split_first().ok_or_else(|| CommandError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: program.clone(),
                source,
            })?;

        // Both pipes feed one shared buffer; the reader tasks outlive the
        // select below so buffered output survives a timeout kill.
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut stdout_task = child
            .stdout
            .take()
            .map(|pipe| spawn_pump(pipe, buffer.clone(), sink.clone()));
        let mut stderr_task = child
            .stderr
            .take()
            .map(|pipe| spawn_pump(pipe, buffer.clone(), sink.clone()));

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                drain(&mut stdout_task, &mut stderr_task).await;
                let output = buffer.lock().await.clone();
                Ok(CommandOutcome {
                    exit_code: status.code().unwrap_or(-1),
                    output,
                })
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Command deadline expired, killing process"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out process");
                }
                // Descendants of the killed child can inherit the pipe
                // write ends, so EOF may never come. Give the readers a
                // short grace to flush, then abandon them.
                let flush = drain(&mut stdout_task, &mut stderr_task);
                if tokio::time::timeout(KILL_DRAIN_GRACE, flush).await.is_err() {
                    warn!("Output pipes held open past the kill, abandoning readers");
                    abort(stdout_task, stderr_task);
                }
                let output = buffer.lock().await.clone();
                Err(CommandError::TimedOut { output })
            }
        }
    }
}

fn spawn_pump<R>(
    pipe: R,
    buffer: Arc<Mutex<String>>,
    sink: Arc<dyn OutputSink>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    sink.line(line.trim_end_matches(['\r', '\n']));
                    buffer.lock().await.push_str(&line);
                }
                Err(e) => {
                    warn!(error = %e, "Error reading command output");
                    break;
                }
            }
        }
    })
}

async fn drain(stdout_task: &mut Option<JoinHandle<()>>, stderr_task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }
}

fn abort(stdout_task: Option<JoinHandle<()>>, stderr_task: Option<JoinHandle<()>>) {
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        task.abort();
    }
}
