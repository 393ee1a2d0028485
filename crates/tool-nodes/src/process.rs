//! Local process executor
//!
//! Runs a [`CommandLine`] with `tokio::process::Command`, captures stdout and
//! stderr, and kills the child as soon as the kill token is cancelled.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tool_engine::{
    CommandLine, Result, ToolEngineError, ToolExecutor, ToolOutput, FAILURE_EXIT_CODE,
};

/// How long to wait for the output pipes to drain after a kill
const KILL_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Executor spawning the tool as a local child process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolExecutor;

impl ProcessToolExecutor {
    pub const NAME: &'static str = "local";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for ProcessToolExecutor {
    async fn execute(&self, command: &CommandLine, kill: CancellationToken) -> Result<ToolOutput> {
        let program = command
            .program()
            .ok_or_else(|| ToolEngineError::invalid_value("argv", "empty command line"))?;

        log::debug!(
            "Executing '{}' with {} args in {}",
            program,
            command.args().len(),
            command.working_dir.display()
        );

        let mut cmd = Command::new(program);
        cmd.args(command.args())
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            log::warn!("Failed to spawn '{}': {}", program, e);
            ToolEngineError::Io(e)
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                let exit_code = status.code().unwrap_or(FAILURE_EXIT_CODE);
                let output = combine(stdout, stderr, None).await;
                log::debug!(
                    "'{}' exited with code {}, {} bytes of output",
                    program,
                    exit_code,
                    output.len()
                );
                Ok(ToolOutput::new(exit_code, output))
            }
            _ = kill.cancelled() => {
                log::info!("Killing '{}'", program);
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill '{}': {}", program, e);
                }
                let output = combine(stdout, stderr, Some(KILL_DRAIN_TIMEOUT)).await;
                Ok(ToolOutput {
                    exit_code: FAILURE_EXIT_CODE,
                    output,
                    killed: true,
                })
            }
        }
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pipe.map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf).await {
                log::debug!("Stopped reading tool output: {}", e);
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

/// Stdout followed by stderr
///
/// With a `grace` period, readers still blocked afterwards (e.g. on a pipe
/// held open by a grandchild) are abandoned.
async fn combine(
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
    grace: Option<Duration>,
) -> String {
    let mut combined = String::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        let text = match grace {
            Some(grace) => {
                let abort = handle.abort_handle();
                match tokio::time::timeout(grace, handle).await {
                    Ok(joined) => joined.unwrap_or_default(),
                    Err(_) => {
                        abort.abort();
                        String::new()
                    }
                }
            }
            None => handle.await.unwrap_or_default(),
        };
        combined.push_str(&text);
    }
    combined
}
