//! Tool Engine - descriptor-driven command-line tool nodes
//!
//! This crate turns a declarative tool descriptor into a typed node model
//! and runs the described tool. It provides:
//!
//! - A closed parameter type system with lossless string round-trips
//! - A streaming descriptor parser built on an explicit state stack
//! - Typed input/output ports with format candidates
//! - An async execution coordinator with a cancellation watchdog
//! - Output resolution through a MIME registry and URI converter chains
//!
//! # Architecture
//!
//! ```text
//! descriptor XML -> parse_descriptor -> NodeConfiguration
//!     -> CommandGenerator -> CommandLine
//!     -> run_with_watchdog(ToolExecutor) -> ToolOutput
//!     -> OutputResolver -> OutputPayload per output port
//! ```
//!
//! Concrete executors and generators live outside this crate and are found
//! by name through [`ExecutorRegistry`].
//!
//! # Example
//!
//! ```ignore
//! use tool_engine::{parse_descriptor, NodeSettings};
//!
//! let mut config = parse_descriptor(&std::fs::read_to_string("sort.ctd")?)?;
//! NodeSettings::from_json(&saved)?.load_into(&mut config);
//! for key in config.keys() {
//!     println!("{} = {}", key, config.parameter(key).unwrap().string_rep());
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod exec;
pub mod output;
pub mod params;
pub mod parser;
pub mod port;
pub mod settings;
pub mod stash;

// Re-export key types
pub use config::{CliElement, NodeConfiguration, Relocator};
pub use descriptor::{ParameterMetadata, PortMetadata, TaskMetadata};
pub use error::{Result, ToolEngineError};
pub use events::{emit, ChannelEventSink, EventError, EventSink, ExecutionEvent, NullEventSink};
pub use exec::{
    run_with_watchdog, AsyncToolExecution, CancelSignal, CommandGenerator, CommandLine,
    ExecutorFn, ExecutorRegistry, GenerationContext, GeneratorFn, KillHandle, ToolExecutor,
    ToolOutput, Watchdog, FAILURE_EXIT_CODE, WATCHDOG_POLL_INTERVAL,
};
pub use output::{ConverterChain, MimeRegistry, OutputPayload, OutputResolver, UriConverter};
pub use params::{Bounds, Choice, Parameter, ParameterKind, LIST_SEPARATOR};
pub use parser::{normalize_path, parse_descriptor};
pub use port::{Port, PortDirection};
pub use settings::{NodeSettings, ToolNodeConfig};
pub use stash::FileStash;
