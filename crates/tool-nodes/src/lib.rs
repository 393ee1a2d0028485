//! Tool Nodes
//!
//! Concrete implementations for the tool engine's execution contracts and
//! the glue that turns a tool descriptor into a runnable workflow node.
//!
//! - **process**: runs command lines as local child processes
//! - **generator**: builds command lines from CLI mappings and relocators
//! - **node**: end-to-end execution of one tool run
//! - **task**: graph-flow `Task` adapter

pub mod generator;
pub mod node;
pub mod process;
pub mod setup;
pub mod task;

pub use generator::CliCommandGenerator;
pub use node::{ToolNode, ToolRun};
pub use process::ProcessToolExecutor;
pub use setup::builtin_registry;
pub use task::{ContextKeys, ToolNodeTask};
