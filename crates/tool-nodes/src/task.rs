//! Tool Node Task
//!
//! Adapts a [`ToolNode`] to graph-flow's Task model. Ports use the usual
//! context key conventions:
//!
//! - Inputs: `{task_id}.input.{port}`: a path string or an array of paths
//! - Outputs: `{task_id}.output.{port}`: `{"uris": [...], "mime": "..."}`
//! - Tool log: `{task_id}.meta.log`, the captured output of the last run
//!
//! Output files stay on disk until the task runs again or is dropped.
//!
//! The task's cancellation token lives as long as the task. Once cancelled,
//! every later run fails with [`ToolEngineError::Cancelled`] without starting
//! the tool; build a new task to run again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tool_engine::{OutputPayload, ToolEngineError};

use crate::node::{ToolNode, ToolRun};

/// Helper for building context keys
pub struct ContextKeys;

impl ContextKeys {
    /// Build an input key: `{task_id}.input.{port}`
    pub fn input(task_id: &str, port: &str) -> String {
        format!("{}.input.{}", task_id, port)
    }

    /// Build an output key: `{task_id}.output.{port}`
    pub fn output(task_id: &str, port: &str) -> String {
        format!("{}.output.{}", task_id, port)
    }

    /// Build a metadata key: `{task_id}.meta.{field}`
    pub fn meta(task_id: &str, field: &str) -> String {
        format!("{}.meta.{}", task_id, field)
    }
}

/// Workflow task running one tool node
pub struct ToolNodeTask {
    task_id: String,
    node: Arc<ToolNode>,
    cancel: CancellationToken,
    last_run: Mutex<Option<ToolRun>>,
}

impl ToolNodeTask {
    pub const META_LOG: &'static str = "log";

    pub fn new(task_id: impl Into<String>, node: Arc<ToolNode>) -> Self {
        Self {
            task_id: task_id.into(),
            node,
            cancel: CancellationToken::new(),
            last_run: Mutex::new(None),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Token that kills the running tool when cancelled
    ///
    /// Cancellation is permanent for this task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn read_inputs(&self, context: &Context) -> HashMap<String, Vec<PathBuf>> {
        let mut inputs = HashMap::new();
        for port in self.node.config().input_ports() {
            let key = ContextKeys::input(&self.task_id, &port.name);
            let Some(value) = context.get::<serde_json::Value>(&key).await else {
                continue;
            };
            let files: Vec<PathBuf> = match value {
                serde_json::Value::String(path) => vec![PathBuf::from(path)],
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(PathBuf::from))
                    .collect(),
                other => {
                    log::warn!("Ignoring non-path value at '{}': {}", key, other);
                    continue;
                }
            };
            inputs.insert(port.name.clone(), files);
        }
        inputs
    }
}

fn payload_value(payload: &OutputPayload) -> serde_json::Value {
    serde_json::json!({
        "uris": payload.uris.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
        "mime": payload.mime.essence_str(),
    })
}

fn task_error(task_id: &str, error: ToolEngineError) -> GraphError {
    let message = match error.diagnostic_output() {
        Some(output) if !output.is_empty() => format!("{}\n{}", error, output),
        _ => error.to_string(),
    };
    GraphError::TaskExecutionFailed(format!("Tool task {}: {}", task_id, message))
}

#[async_trait]
impl Task for ToolNodeTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        if self.cancel.is_cancelled() {
            return Err(task_error(&self.task_id, ToolEngineError::Cancelled));
        }
        let inputs = self.read_inputs(&context).await;

        log::debug!(
            "ToolNodeTask {}: running '{}' with {} bound input port(s)",
            self.task_id,
            self.node.config().name,
            inputs.len()
        );

        // Drop the previous job directory before starting a new one
        let mut last_run = self.last_run.lock().await;
        *last_run = None;

        let run = self
            .node
            .run(&self.task_id, &inputs, Arc::new(self.cancel.clone()))
            .await
            .map_err(|e| task_error(&self.task_id, e))?;

        for payload in &run.payloads {
            let key = ContextKeys::output(&self.task_id, &payload.port);
            context.set(&key, payload_value(payload)).await;
        }
        let log_key = ContextKeys::meta(&self.task_id, Self::META_LOG);
        context.set(&log_key, run.output.output.clone()).await;

        let message = format!(
            "Tool '{}' produced {} output(s)",
            self.node.config().name,
            run.payloads.len()
        );
        *last_run = Some(run);

        Ok(TaskResult::new(Some(message), NextAction::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keys() {
        assert_eq!(ContextKeys::input("t1", "sort.in"), "t1.input.sort.in");
        assert_eq!(ContextKeys::output("t1", "sort.out"), "t1.output.sort.out");
        assert_eq!(ContextKeys::meta("t1", "log"), "t1.meta.log");
    }

    #[tokio::test]
    async fn test_cancelled_task_does_not_start_tool() {
        let descriptor = r#"<tool name="Noop" version="1"></tool>"#;
        // Empty registry: starting the tool would fail with an unknown executor
        let registry = Arc::new(tool_engine::ExecutorRegistry::new());
        let node = Arc::new(ToolNode::from_descriptor(descriptor, registry).unwrap());
        let task = ToolNodeTask::new("t1", node);
        task.cancel_token().cancel();

        for _ in 0..2 {
            match task.run(Context::new()).await {
                Err(GraphError::TaskExecutionFailed(message)) => {
                    assert!(message.contains("cancelled"), "{}", message);
                }
                other => panic!("unexpected result: {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_task_error_carries_tool_output() {
        let err = task_error(
            "t1",
            ToolEngineError::ExecutionFailed {
                exit_code: 2,
                output: "unknown option".into(),
            },
        );
        match err {
            GraphError::TaskExecutionFailed(message) => {
                assert!(message.contains("exit code 2"));
                assert!(message.contains("unknown option"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
