//! Built-in executor and generator registration.
//!
//! Both implementations are submitted via `inventory`, so hosts only need
//! [`builtin_registry`] (or `ExecutorRegistry::with_builtins`) and never name
//! the concrete types.

use std::sync::Arc;

use tool_engine::{CommandGenerator, ExecutorFn, ExecutorRegistry, GeneratorFn, ToolExecutor};

use crate::generator::CliCommandGenerator;
use crate::process::ProcessToolExecutor;

fn local_executor() -> Arc<dyn ToolExecutor> {
    Arc::new(ProcessToolExecutor::new())
}

fn cli_generator() -> Arc<dyn CommandGenerator> {
    Arc::new(CliCommandGenerator::new())
}

inventory::submit!(ExecutorFn {
    name: ProcessToolExecutor::NAME,
    factory: local_executor,
});

inventory::submit!(GeneratorFn {
    name: CliCommandGenerator::NAME,
    factory: cli_generator,
});

/// Registry with every built-in executor and generator.
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(tool_nodes::builtin_registry());
/// let node = ToolNode::from_descriptor(&descriptor, registry)?;
/// ```
pub fn builtin_registry() -> ExecutorRegistry {
    ExecutorRegistry::with_builtins()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = builtin_registry();
        assert!(registry.has_executor(ProcessToolExecutor::NAME));
        assert!(registry.has_generator(CliCommandGenerator::NAME));
    }
}
