//! Command line generation from CLI mappings
//!
//! When the descriptor has a `cli` section, every `clielement` contributes its
//! option identifier followed by the values of its mapped parameters. Without
//! one, each set parameter becomes `-<name> <values...>`, where the name is
//! the key without its leading tool segment and with `:` between sections.
//!
//! In both modes:
//! - ignored and unset parameters contribute nothing
//! - a boolean contributes just its flag, and only when true
//!
//! A list parameter mapped to a `clielement` with `isList="false"` repeats the
//! option identifier before every value; list elements pass one identifier
//! followed by all values.
//! - file paths with a relocator are rewritten into the working directory

use std::path::PathBuf;

use tool_engine::{
    CliElement, CommandGenerator, CommandLine, GenerationContext, NodeConfiguration, Parameter,
    ParameterKind, Result, ToolEngineError,
};

/// Default command generator
#[derive(Debug, Clone, Copy, Default)]
pub struct CliCommandGenerator;

impl CliCommandGenerator {
    pub const NAME: &'static str = "cli";

    pub fn new() -> Self {
        Self
    }
}

impl CommandGenerator for CliCommandGenerator {
    fn generate(
        &self,
        config: &NodeConfiguration,
        context: &GenerationContext,
    ) -> Result<CommandLine> {
        let mut argv = vec![context.executable.to_string_lossy().into_owned()];

        if config.cli.is_empty() {
            for parameter in config.parameters() {
                let flag = format!("-{}", option_name(parameter.key()));
                push_parameter(&mut argv, &flag, false, parameter, config, context)?;
            }
        } else {
            for element in &config.cli {
                push_element(&mut argv, element, config, context)?;
            }
        }

        log::debug!("Generated command for '{}': {:?}", config.name, argv);
        Ok(CommandLine::new(argv, &context.work_dir))
    }
}

fn push_element(
    argv: &mut Vec<String>,
    element: &CliElement,
    config: &NodeConfiguration,
    context: &GenerationContext,
) -> Result<()> {
    if element.mappings.is_empty() {
        // Constant flag
        if !element.option_identifier.is_empty() {
            argv.push(element.option_identifier.clone());
        }
        return Ok(());
    }

    for key in &element.mappings {
        let parameter = config.parameter(key).ok_or_else(|| {
            ToolEngineError::parse(key.as_str(), "CLI mapping references an unknown parameter")
        })?;
        let repeat_flag = !element.is_list && parameter.is_list();
        push_parameter(
            argv,
            &element.option_identifier,
            repeat_flag,
            parameter,
            config,
            context,
        )?;
    }
    Ok(())
}

/// Append `flag` and the values of `parameter`; an empty flag emits values only
///
/// With `repeat_flag`, the flag precedes each value instead of the first one.
fn push_parameter(
    argv: &mut Vec<String>,
    flag: &str,
    repeat_flag: bool,
    parameter: &Parameter,
    config: &NodeConfiguration,
    context: &GenerationContext,
) -> Result<()> {
    if parameter.ignored || !parameter.is_set() {
        return Ok(());
    }
    if !parameter.validate() {
        return Err(ToolEngineError::invalid_value(
            parameter.key(),
            format!("'{}' is outside the allowed domain", parameter.string_rep()),
        ));
    }

    if let ParameterKind::Bool { value } = parameter.kind() {
        if *value == Some(true) {
            if flag.is_empty() {
                log::debug!(
                    "Boolean '{}' has no option identifier; nothing to pass",
                    parameter.key()
                );
            } else {
                argv.push(flag.to_string());
            }
        }
        return Ok(());
    }

    let values = argument_values(parameter, config, context);
    if flag.is_empty() {
        argv.extend(values);
    } else if repeat_flag {
        for value in values {
            argv.push(flag.to_string());
            argv.push(value);
        }
    } else {
        argv.push(flag.to_string());
        argv.extend(values);
    }
    Ok(())
}

/// Values of a parameter, with relocated paths for file parameters
fn argument_values(
    parameter: &Parameter,
    config: &NodeConfiguration,
    context: &GenerationContext,
) -> Vec<String> {
    let values = parameter.values();
    let relocator = match parameter.port_name() {
        Some(_) => config.relocator_for(parameter.key()),
        None => None,
    };
    match relocator {
        Some(relocator) => values
            .iter()
            .map(|v| {
                relocator
                    .relocate(&PathBuf::from(v), &context.work_dir)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect(),
        None => values,
    }
}

/// `Tool.algorithm.threshold` → `algorithm:threshold`
fn option_name(key: &str) -> String {
    match key.split_once('.') {
        Some((_, rest)) => rest.replace('.', ":"),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tool_engine::{parse_descriptor, Relocator};

    use super::*;

    const DESCRIPTOR: &str = r#"
<tool name="Sorter" version="2.0">
  <executableName>sort</executableName>
  <cli>
    <clielement optionIdentifier="-r" isList="false">
      <mapping referenceName="sort.reverse"/>
    </clielement>
    <clielement optionIdentifier="-k" isList="false">
      <mapping referenceName="sort.key"/>
    </clielement>
    <clielement optionIdentifier="-o" isList="false">
      <mapping referenceName="sort.out"/>
    </clielement>
    <clielement optionIdentifier="" isList="false">
      <mapping referenceName="sort.in"/>
    </clielement>
  </cli>
  <PARAMETERS>
    <NODE name="sort">
      <ITEM name="reverse" type="string" value="true" restrictions="true,false"/>
      <ITEM name="key" type="int" value="" restrictions="1:"/>
      <ITEM name="in" type="input-file" supported_formats="*.txt" required="true"/>
      <ITEM name="out" type="output-file" supported_formats="*.txt" required="true"/>
    </NODE>
  </PARAMETERS>
</tool>"#;

    fn context() -> GenerationContext {
        GenerationContext {
            executable: PathBuf::from("/usr/bin/sort"),
            work_dir: PathBuf::from("/jobs/1"),
        }
    }

    fn configured() -> NodeConfiguration {
        let mut config = parse_descriptor(DESCRIPTOR).unwrap();
        config
            .file_parameter_mut("sort.in")
            .unwrap()
            .fill_from_string("/data/in.txt")
            .unwrap();
        config
            .file_parameter_mut("sort.out")
            .unwrap()
            .fill_from_string("/stash/out.txt")
            .unwrap();
        config
    }

    #[test]
    fn test_cli_mappings() {
        let cmd = CliCommandGenerator.generate(&configured(), &context()).unwrap();
        assert_eq!(
            cmd.argv,
            vec!["/usr/bin/sort", "-r", "-o", "/stash/out.txt", "/data/in.txt"]
        );
        assert_eq!(cmd.working_dir, Path::new("/jobs/1"));
    }

    #[test]
    fn test_set_values_and_false_booleans() {
        let mut config = configured();
        config.parameter_mut("sort.key").unwrap().fill_from_string("3").unwrap();
        config
            .parameter_mut("sort.reverse")
            .unwrap()
            .fill_from_string("false")
            .unwrap();

        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert_eq!(
            cmd.argv,
            vec!["/usr/bin/sort", "-k", "3", "-o", "/stash/out.txt", "/data/in.txt"]
        );
    }

    #[test]
    fn test_relocated_output() {
        let mut config = configured();
        config.add_relocator(Relocator::new("sort.out", "%TEMP%/sorted_%FILE%"));

        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert!(cmd.argv.contains(&"/jobs/1/sorted_out.txt".to_string()));
        assert!(!cmd.argv.contains(&"/stash/out.txt".to_string()));
    }

    #[test]
    fn test_flag_fallback_without_cli() {
        let mut config = configured();
        config.cli.clear();
        let mut threshold = Parameter::double("sort.algo.threshold", Default::default());
        threshold.fill_from_string("0.5").unwrap();
        config.add_parameter(threshold).unwrap();
        let mut hidden = Parameter::string("sort.hidden");
        hidden.fill_from_string("x").unwrap();
        hidden.ignored = true;
        config.add_parameter(hidden).unwrap();

        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert_eq!(
            cmd.argv,
            vec![
                "/usr/bin/sort",
                "-reverse",
                "-in",
                "/data/in.txt",
                "-out",
                "/stash/out.txt",
                "-algo:threshold",
                "5e-1",
            ]
        );
    }

    #[test]
    fn test_list_flag_repetition_follows_is_list() {
        let mut config = configured();
        let mut columns = Parameter::int_list("sort.columns", Default::default());
        columns
            .fill_from_strings(&["1".to_string(), "4".to_string()])
            .unwrap();
        config.add_parameter(columns).unwrap();
        config.cli = vec![CliElement {
            option_identifier: "-c".into(),
            is_list: false,
            mappings: vec!["sort.columns".into()],
        }];

        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert_eq!(cmd.argv, vec!["/usr/bin/sort", "-c", "1", "-c", "4"]);

        config.cli[0].is_list = true;
        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert_eq!(cmd.argv, vec!["/usr/bin/sort", "-c", "1", "4"]);
    }

    #[test]
    fn test_positional_true_boolean_is_skipped() {
        let mut config = configured();
        config.cli = vec![CliElement {
            option_identifier: String::new(),
            is_list: false,
            mappings: vec!["sort.reverse".into()],
        }];
        let cmd = CliCommandGenerator.generate(&config, &context()).unwrap();
        assert_eq!(cmd.argv, vec!["/usr/bin/sort"]);
    }

    #[test]
    fn test_unknown_mapping_is_error() {
        let mut config = configured();
        config.cli.push(CliElement {
            option_identifier: "-x".into(),
            is_list: false,
            mappings: vec!["sort.missing".into()],
        });
        assert!(CliCommandGenerator.generate(&config, &context()).is_err());
    }

    #[test]
    fn test_option_name() {
        assert_eq!(option_name("Tool.algorithm.threshold"), "algorithm:threshold");
        assert_eq!(option_name("single"), "single");
    }
}
