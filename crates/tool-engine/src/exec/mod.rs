//! Tool execution pipeline
//!
//! The pipeline consumes two contracts implemented outside this crate:
//!
//! - [`CommandGenerator`] turns a configuration into a [`CommandLine`]
//! - [`ToolExecutor`] runs a command line and captures its output
//!
//! [`run_with_watchdog`] wraps one executor invocation in a background task
//! and pairs it with a watchdog that polls an external cancellation signal.

mod coordinator;
mod registry;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::NodeConfiguration;
use crate::error::{Result, ToolEngineError};

pub use coordinator::{run_with_watchdog, AsyncToolExecution, KillHandle, Watchdog};
pub use registry::{ExecutorFn, ExecutorRegistry, GeneratorFn};

/// Exit code reported for killed, erroring or panicking runs
pub const FAILURE_EXIT_CODE: i32 = -1;

/// How often the watchdog polls the cancellation signal
pub const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An ordered argument vector plus the directory to run it in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLine {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandLine {
    pub fn new(argv: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            working_dir: working_dir.into(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// Inputs a command generator needs besides the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    /// Resolved path (or name) of the tool executable
    pub executable: PathBuf,
    /// Job working directory
    pub work_dir: PathBuf,
}

/// Captured result of one tool run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub exit_code: i32,
    /// Combined stdout and stderr
    pub output: String,
    /// The run was forcibly terminated
    pub killed: bool,
}

impl ToolOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            killed: false,
        }
    }

    /// Output carrying the failure sentinel exit code
    pub fn failure(output: impl Into<String>) -> Self {
        Self::new(FAILURE_EXIT_CODE, output)
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.killed
    }

    /// Convert a non-zero exit into [`ToolEngineError::ExecutionFailed`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ToolEngineError::ExecutionFailed {
                exit_code: self.exit_code,
                output: self.output,
            })
        }
    }
}

/// Builds the command line for a configured tool
pub trait CommandGenerator: Send + Sync {
    fn generate(
        &self,
        config: &NodeConfiguration,
        context: &GenerationContext,
    ) -> Result<CommandLine>;
}

/// Runs a command line to completion
///
/// Implementations must terminate the underlying process once `kill` is
/// cancelled and return promptly afterwards.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, command: &CommandLine, kill: CancellationToken) -> Result<ToolOutput>;
}

/// External cancellation signal polled by the watchdog
pub trait CancelSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancelSignal for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

impl CancelSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_parts() {
        let cmd = CommandLine::new(vec!["sort".into(), "-r".into()], "/tmp");
        assert_eq!(cmd.program(), Some("sort"));
        assert_eq!(cmd.args(), &["-r".to_string()]);

        let empty = CommandLine::new(Vec::new(), "/tmp");
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }

    #[test]
    fn test_tool_output_into_result() {
        assert!(ToolOutput::new(0, "ok").into_result().is_ok());

        let err = ToolOutput::new(3, "bad").into_result().unwrap_err();
        assert!(matches!(err, ToolEngineError::ExecutionFailed { exit_code: 3, .. }));
        assert_eq!(err.diagnostic_output(), Some("bad"));

        let mut killed = ToolOutput::new(0, "");
        killed.killed = true;
        assert!(killed.into_result().is_err());
    }

    #[test]
    fn test_cancel_signals() {
        let token = CancellationToken::new();
        assert!(!CancelSignal::is_cancelled(&token));
        token.cancel();
        assert!(CancelSignal::is_cancelled(&token));

        let flag = AtomicBool::new(false);
        assert!(!flag.is_cancelled());
        flag.store(true, Ordering::Release);
        assert!(flag.is_cancelled());
    }
}
