//! Async execution coordinator
//!
//! One tool invocation runs as two independent tasks:
//!
//! - the execution task drives the [`ToolExecutor`] and publishes a done flag
//! - the watchdog polls an external [`CancelSignal`] every
//!   [`WATCHDOG_POLL_INTERVAL`] and kills the execution once when it fires
//!
//! The caller joins the execution task first, then the watchdog. The
//! watchdog exits within one poll interval of the done flag being set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{CancelSignal, CommandLine, ToolExecutor, ToolOutput, WATCHDOG_POLL_INTERVAL};

/// Shared view of a running execution: done flag plus kill switch
#[derive(Clone)]
pub struct KillHandle {
    done: Arc<AtomicBool>,
    kill: CancellationToken,
}

impl KillHandle {
    /// Force termination of the running tool
    pub fn kill(&self) {
        self.kill.cancel();
    }

    pub fn is_killed(&self) -> bool {
        self.kill.is_cancelled()
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }
}

/// A tool invocation running on its own task
pub struct AsyncToolExecution {
    handle: JoinHandle<ToolOutput>,
    control: KillHandle,
}

impl AsyncToolExecution {
    /// Start running `command` on a background task
    pub fn spawn(executor: Arc<dyn ToolExecutor>, command: CommandLine) -> Self {
        let control = KillHandle {
            done: Arc::new(AtomicBool::new(false)),
            kill: CancellationToken::new(),
        };

        let task_control = control.clone();
        let handle = tokio::spawn(async move {
            let result = executor
                .execute(&command, task_control.kill.clone())
                .await;
            let output = match result {
                Ok(mut output) if task_control.is_killed() => {
                    output.exit_code = super::FAILURE_EXIT_CODE;
                    output.killed = true;
                    output
                }
                Ok(output) => output,
                Err(e) => {
                    log::warn!("Tool executor failed for {:?}: {}", command.program(), e);
                    let mut output = ToolOutput::failure(e.to_string());
                    output.killed = task_control.is_killed();
                    output
                }
            };
            task_control.mark_done();
            output
        });

        Self { handle, control }
    }

    pub fn is_done(&self) -> bool {
        self.control.is_done()
    }

    /// Force termination of the running tool
    pub fn kill(&self) {
        self.control.kill();
    }

    /// Handle for the watchdog (or any other party) to observe and kill the run
    pub fn kill_handle(&self) -> KillHandle {
        self.control.clone()
    }

    /// Block until the execution task ends
    ///
    /// A panicking executor yields the failure sentinel exit code.
    pub async fn wait_until_finished(self) -> ToolOutput {
        let output = match self.handle.await {
            Ok(output) => output,
            Err(e) => {
                log::error!("Tool execution task aborted: {}", e);
                let mut output = ToolOutput::failure(format!("execution task aborted: {}", e));
                output.killed = self.control.is_killed();
                output
            }
        };
        // Also covers the panic path, where the task never set the flag
        self.control.mark_done();
        output
    }
}

/// Polls a cancellation signal and kills an execution when it fires
pub struct Watchdog {
    handle: JoinHandle<bool>,
}

impl Watchdog {
    pub fn spawn(execution: KillHandle, signal: Arc<dyn CancelSignal>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(WATCHDOG_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                if execution.is_done() {
                    return false;
                }
                if signal.is_cancelled() {
                    log::info!("Cancellation requested, killing tool execution");
                    execution.kill();
                    return true;
                }
            }
        });
        Self { handle }
    }

    /// Wait for the watchdog to stop; returns whether it killed the execution
    pub async fn join(self) -> bool {
        self.handle.await.unwrap_or_else(|e| {
            log::error!("Watchdog task aborted: {}", e);
            false
        })
    }
}

/// Run `command` with `executor` under a cancellation watchdog
///
/// Joins the execution task, then the watchdog. The run is reported as
/// killed only when the kill reached the tool before it finished.
pub async fn run_with_watchdog(
    executor: Arc<dyn ToolExecutor>,
    command: CommandLine,
    signal: Arc<dyn CancelSignal>,
) -> ToolOutput {
    let execution = AsyncToolExecution::spawn(executor, command);
    let watchdog = Watchdog::spawn(execution.kill_handle(), signal);

    let output = execution.wait_until_finished().await;
    if watchdog.join().await && !output.killed {
        log::debug!("Cancellation arrived after the tool finished; keeping its result");
    }
    output
}
