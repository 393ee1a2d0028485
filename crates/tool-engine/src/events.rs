//! Event types for reporting tool execution progress
//!
//! Events are sent from a running tool node to the host (or any consumer)
//! to report the generated command, termination and the final outcome.

use serde::{Deserialize, Serialize};

/// Trait for sending execution events
///
/// This abstracts over the transport mechanism (channel, log, UI bridge)
/// so the execution pipeline can be used in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted while a tool node executes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    /// Execution of a node started
    #[serde(rename_all = "camelCase")]
    Started { node_id: String, tool: String },

    /// The command line was generated and is about to run
    #[serde(rename_all = "camelCase")]
    CommandGenerated {
        node_id: String,
        argv: Vec<String>,
        working_dir: String,
    },

    /// The running tool was forcibly terminated after cancellation
    #[serde(rename_all = "camelCase")]
    Killed { node_id: String },

    /// The tool failed; `output` holds its captured output
    #[serde(rename_all = "camelCase")]
    Failed {
        node_id: String,
        exit_code: i32,
        output: String,
    },

    /// The tool succeeded and its outputs were resolved
    #[serde(rename_all = "camelCase")]
    Completed { node_id: String, outputs: usize },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: ExecutionEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Event sink backed by an unbounded tokio channel
pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver consuming its events
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: ExecutionEvent) -> Result<(), EventError> {
        self.tx.send(event).map_err(|_| EventError::channel_closed())
    }
}

/// Send an event, logging instead of failing when the sink is gone
pub fn emit(sink: &dyn EventSink, event: ExecutionEvent) {
    if let Err(e) = sink.send(event) {
        log::debug!("Dropping execution event: {}", e);
    }
}
