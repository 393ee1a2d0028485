//! Registry of tool executors and command generators
//!
//! Nodes name the executor and generator they run with; the registry maps
//! those names to shared implementations. Built-ins are collected at link
//! time via `inventory`:
//!
//! ```ignore
//! inventory::submit!(tool_engine::ExecutorFn {
//!     name: "local",
//!     factory: || Arc::new(ProcessToolExecutor::new()),
//! });
//! ```
//!
//! Lookups happen before any process is spawned, so a misconfigured node
//! fails without side effects.

use std::collections::HashMap;
use std::sync::Arc;

use super::{CommandGenerator, ToolExecutor};
use crate::error::{Result, ToolEngineError};

/// Link-time registration of a tool executor
pub struct ExecutorFn {
    pub name: &'static str,
    pub factory: fn() -> Arc<dyn ToolExecutor>,
}

inventory::collect!(ExecutorFn);

/// Link-time registration of a command generator
pub struct GeneratorFn {
    pub name: &'static str,
    pub factory: fn() -> Arc<dyn CommandGenerator>,
}

inventory::collect!(GeneratorFn);

/// Named executor and generator implementations
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn ToolExecutor>>,
    generators: HashMap<String, Arc<dyn CommandGenerator>>,
}

impl ExecutorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every implementation submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in inventory::iter::<ExecutorFn> {
            registry.register_executor(entry.name, (entry.factory)());
        }
        for entry in inventory::iter::<GeneratorFn> {
            registry.register_generator(entry.name, (entry.factory)());
        }
        log::debug!(
            "Registered {} executor(s) and {} command generator(s)",
            registry.executors.len(),
            registry.generators.len()
        );
        registry
    }

    /// Register an executor, replacing any previous one with the same name
    pub fn register_executor(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.executors.insert(name.into(), executor);
    }

    /// Register a command generator, replacing any previous one with the same name
    pub fn register_generator(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn CommandGenerator>,
    ) {
        self.generators.insert(name.into(), generator);
    }

    pub fn executor(&self, name: &str) -> Result<Arc<dyn ToolExecutor>> {
        self.executors
            .get(name)
            .cloned()
            .ok_or_else(|| ToolEngineError::UnknownExecutor(name.to_string()))
    }

    pub fn generator(&self, name: &str) -> Result<Arc<dyn CommandGenerator>> {
        self.generators
            .get(name)
            .cloned()
            .ok_or_else(|| ToolEngineError::UnknownCommandGenerator(name.to_string()))
    }

    pub fn has_executor(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    pub fn has_generator(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Registered executor names, sorted
    pub fn executor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered generator names, sorted
    pub fn generator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Merge another registry into this one; entries from `other` win
    pub fn merge(&mut self, other: ExecutorRegistry) {
        self.executors.extend(other.executors);
        self.generators.extend(other.generators);
    }
}
