//! End-to-end execution of a descriptor-driven tool node
//!
//! A [`ToolNode`] owns the parsed configuration template plus the settings a
//! host stored for it. Every [`ToolNode::run`] works on a fresh copy:
//!
//! 1. look up the configured executor and generator
//! 2. apply settings and bind input files to input ports
//! 3. allocate output files in a new job directory
//! 4. generate the command line and run it under the watchdog
//! 5. move relocated outputs back and resolve output payloads
//!
//! Execution is all-or-nothing: any failure returns an error and no payloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tool_engine::{
    emit, parse_descriptor, run_with_watchdog, CancelSignal, CommandLine, EventSink,
    ExecutionEvent, ExecutorRegistry, FileStash, GenerationContext, NodeConfiguration,
    NodeSettings, NullEventSink, OutputPayload, OutputResolver, Port, Result, TaskMetadata,
    ToolEngineError, ToolNodeConfig, ToolOutput,
};

/// Outcome of a successful run
///
/// Output files live in the run's job directory, which is removed when the
/// run is dropped.
#[derive(Debug)]
pub struct ToolRun {
    pub payloads: Vec<OutputPayload>,
    pub command: CommandLine,
    pub output: ToolOutput,
    job: FileStash,
}

impl ToolRun {
    pub fn job_dir(&self) -> &Path {
        self.job.dir()
    }

    pub fn payload(&self, port: &str) -> Option<&OutputPayload> {
        self.payloads.iter().find(|p| p.port == port)
    }
}

/// A configured command-line tool node
pub struct ToolNode {
    config: NodeConfiguration,
    settings: NodeSettings,
    runtime: ToolNodeConfig,
    registry: Arc<ExecutorRegistry>,
    resolver: OutputResolver,
    events: Arc<dyn EventSink>,
}

impl ToolNode {
    pub fn new(config: NodeConfiguration, registry: Arc<ExecutorRegistry>) -> Self {
        let settings = NodeSettings::from_configuration(&config);
        Self {
            config,
            settings,
            runtime: ToolNodeConfig::default(),
            registry,
            resolver: OutputResolver::default(),
            events: Arc::new(NullEventSink),
        }
    }

    /// Parse `descriptor` and wrap it in a node with default settings
    pub fn from_descriptor(descriptor: &str, registry: Arc<ExecutorRegistry>) -> Result<Self> {
        Ok(Self::new(parse_descriptor(descriptor)?, registry))
    }

    pub fn with_settings(mut self, settings: NodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_runtime_config(mut self, runtime: ToolNodeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_resolver(mut self, resolver: OutputResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &NodeConfiguration {
        &self.config
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut NodeSettings {
        &mut self.settings
    }

    pub fn metadata(&self) -> TaskMetadata {
        self.config.task_metadata()
    }

    /// Run the tool once
    ///
    /// `inputs` maps input port names to the files bound to them. The run is
    /// killed when `cancel` fires, which yields [`ToolEngineError::Cancelled`].
    pub async fn run(
        &self,
        node_id: &str,
        inputs: &HashMap<String, Vec<PathBuf>>,
        cancel: Arc<dyn CancelSignal>,
    ) -> Result<ToolRun> {
        emit(
            self.events.as_ref(),
            ExecutionEvent::Started {
                node_id: node_id.to_string(),
                tool: self.config.name.clone(),
            },
        );

        // Configuration errors surface before anything touches the disk
        let executor = self.registry.executor(&self.runtime.executor)?;
        let generator = self.registry.generator(&self.runtime.generator)?;
        self.settings.validate_output_types(&self.config)?;

        let mut config = self.config.clone();
        self.settings.load_into(&mut config);
        bind_inputs(&mut config, inputs)?;

        let job = match &self.runtime.job_root {
            Some(root) => FileStash::in_dir(root)?,
            None => FileStash::new()?,
        };
        allocate_outputs(&mut config, &self.settings, &job)?;

        let context = GenerationContext {
            executable: self.runtime.resolve_executable(&config),
            work_dir: job.dir().to_path_buf(),
        };
        let command = generator.generate(&config, &context)?;
        emit(
            self.events.as_ref(),
            ExecutionEvent::CommandGenerated {
                node_id: node_id.to_string(),
                argv: command.argv.clone(),
                working_dir: command.working_dir.display().to_string(),
            },
        );

        let output = run_with_watchdog(executor, command.clone(), cancel).await;
        if output.killed {
            emit(
                self.events.as_ref(),
                ExecutionEvent::Killed {
                    node_id: node_id.to_string(),
                },
            );
            return Err(ToolEngineError::Cancelled);
        }
        if !output.is_success() {
            log::warn!(
                "Tool '{}' failed with exit code {}",
                config.name,
                output.exit_code
            );
            emit(
                self.events.as_ref(),
                ExecutionEvent::Failed {
                    node_id: node_id.to_string(),
                    exit_code: output.exit_code,
                    output: output.output.clone(),
                },
            );
            return Err(ToolEngineError::ExecutionFailed {
                exit_code: output.exit_code,
                output: output.output,
            });
        }

        restore_relocated(&config, job.dir()).await?;
        let payloads = self.resolver.resolve(&config)?;

        emit(
            self.events.as_ref(),
            ExecutionEvent::Completed {
                node_id: node_id.to_string(),
                outputs: payloads.len(),
            },
        );
        Ok(ToolRun {
            payloads,
            command,
            output,
            job,
        })
    }
}

/// Fill input file parameters; mandatory ports must receive files
fn bind_inputs(config: &mut NodeConfiguration, inputs: &HashMap<String, Vec<PathBuf>>) -> Result<()> {
    let ports: Vec<Port> = config.input_ports().to_vec();
    for port in ports {
        let files = inputs.get(&port.name).map(Vec::as_slice).unwrap_or_default();
        if files.is_empty() {
            if port.optional {
                continue;
            }
            return Err(ToolEngineError::MissingInput(port.name.clone()));
        }
        if !port.multi_file && files.len() > 1 {
            return Err(ToolEngineError::invalid_value(
                &port.name,
                format!("port takes a single file, got {}", files.len()),
            ));
        }

        let values: Vec<String> = files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .collect();
        if let Some(parameter) = config.file_parameter_mut(&port.name) {
            parameter.fill_from_strings(&values)?;
        }
    }
    Ok(())
}

/// Reserve output files in the job directory
///
/// Multi-file output ports get one file per file of the first multi-file
/// input port (or a single file when there is none).
fn allocate_outputs(
    config: &mut NodeConfiguration,
    settings: &NodeSettings,
    job: &FileStash,
) -> Result<()> {
    let list_len = config
        .input_ports()
        .iter()
        .find(|p| p.multi_file)
        .and_then(|p| config.file_parameter(&p.name))
        .map(|p| p.values().len())
        .unwrap_or(1);

    let ports: Vec<Port> = config.output_ports().to_vec();
    for (index, port) in ports.iter().enumerate() {
        let extension = settings.output_type(config, index).unwrap_or_default().to_string();
        let paths = if port.is_prefix {
            vec![job.allocate(&port.name, "")?]
        } else if port.multi_file {
            job.allocate_many(&port.name, &extension, list_len)?
        } else {
            vec![job.allocate(&port.name, &extension)?]
        };

        let values: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if let Some(parameter) = config.file_parameter_mut(&port.name) {
            parameter.fill_from_strings(&values)?;
        }
    }
    Ok(())
}

/// Move files the tool wrote to relocated paths back to their allocated paths
async fn restore_relocated(config: &NodeConfiguration, work_dir: &Path) -> Result<()> {
    for port in config.output_ports() {
        let Some(parameter) = config.file_parameter(&port.name) else {
            continue;
        };
        let Some(relocator) = config.relocator_for(parameter.key()) else {
            continue;
        };
        for value in parameter.values() {
            let allocated = PathBuf::from(value);
            let relocated = relocator.relocate(&allocated, work_dir);
            if relocated != allocated && tokio::fs::try_exists(&relocated).await? {
                log::debug!(
                    "Moving relocated output {} to {}",
                    relocated.display(),
                    allocated.display()
                );
                tokio::fs::rename(&relocated, &allocated).await?;
            }
        }
    }
    Ok(())
}
