use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use qcjson::core::models::result::Provenance;
use qcjson::engine::config::{DispatchConfig, DispatchConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case",
    tag = "type",
    deny_unknown_fields
)]
enum PartialBackendConfig {
    Command {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        working_dir: Option<PathBuf>,
        /// Reported as provenance unless the program's output carries its own.
        creator: Option<String>,
        version: Option<String>,
    },
    Recorded {
        path: PathBuf,
    },
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDispatchConfig {
    timeout_secs: Option<f64>,
    fill_derived_properties: Option<bool>,
    validate_result_shape: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    pretty: Option<bool>,
}

/// The `run` configuration file, with every field optional until merged.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    backend: Option<PartialBackendConfig>,
    dispatch: Option<PartialDispatchConfig>,
    output: Option<PartialOutputConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendSpec {
    Command {
        program: PathBuf,
        args: Vec<String>,
        working_dir: Option<PathBuf>,
        provenance: Option<Provenance>,
    },
    Recorded {
        path: PathBuf,
    },
}

/// Fully resolved settings for one `run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub backend: BackendSpec,
    pub dispatch: DispatchConfig,
    pub pretty: bool,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Merges file values with the command line: `-S` overrides the file, and
    /// dedicated flags override both.
    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;

        let dispatch_file = self.dispatch.take().unwrap_or_default();
        let output_file = self.output.take().unwrap_or_default();

        let backend = Self::merge_backend(args, self.backend.take())?;

        let mut dispatch = DispatchConfigBuilder::new();
        if let Some(fill) = dispatch_file.fill_derived_properties {
            dispatch = dispatch.fill_derived_properties(fill);
        }
        if let Some(validate) = dispatch_file.validate_result_shape {
            dispatch = dispatch.validate_result_shape(validate);
        }
        if let Some(secs) = args.timeout.or(dispatch_file.timeout_secs) {
            dispatch = dispatch.compute_timeout(Self::timeout_from_secs(secs)?);
        }

        Ok(RunConfig {
            backend,
            dispatch: dispatch.build(),
            pretty: args.pretty || output_file.pretty.unwrap_or(false),
        })
    }

    fn merge_backend(
        args: &RunArgs,
        file_backend: Option<PartialBackendConfig>,
    ) -> Result<BackendSpec> {
        if let Some(program) = &args.backend_command {
            return Ok(BackendSpec::Command {
                program: program.clone(),
                args: args.backend_args.clone(),
                working_dir: None,
                provenance: None,
            });
        }
        if let Some(path) = &args.recorded {
            return Ok(BackendSpec::Recorded { path: path.clone() });
        }

        match file_backend {
            Some(PartialBackendConfig::Command {
                program,
                args,
                working_dir,
                creator,
                version,
            }) => {
                let provenance = creator.map(|creator| {
                    Provenance::new(
                        &creator,
                        version.as_deref().unwrap_or("unknown"),
                        "command",
                    )
                });
                Ok(BackendSpec::Command {
                    program,
                    args,
                    working_dir,
                    provenance,
                })
            }
            Some(PartialBackendConfig::Recorded { path }) => Ok(BackendSpec::Recorded { path }),
            None => Err(CliError::Config(
                "A backend is required: set `[backend]` in the config file, \
                 or pass --backend-command or --recorded."
                    .to_string(),
            )),
        }
    }

    fn timeout_from_secs(secs: f64) -> Result<Duration> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(CliError::Config(format!(
                "Timeout must be a positive number of seconds, got {secs}"
            )));
        }
        Duration::try_from_secs_f64(secs)
            .map_err(|e| CliError::Config(format!("Timeout of {secs} seconds is too large: {e}")))
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            let invalid = |kind: &str| {
                CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
            };

            match key {
                "dispatch.timeout-secs" => {
                    self.dispatch
                        .get_or_insert_with(Default::default)
                        .timeout_secs = Some(value_str.parse().map_err(|_| invalid("float"))?);
                }
                "dispatch.fill-derived-properties" => {
                    self.dispatch
                        .get_or_insert_with(Default::default)
                        .fill_derived_properties =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                "dispatch.validate-result-shape" => {
                    self.dispatch
                        .get_or_insert_with(Default::default)
                        .validate_result_shape =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                "output.pretty" => {
                    self.output.get_or_insert_with(Default::default).pretty =
                        Some(value_str.parse().map_err(|_| invalid("boolean"))?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("qcjson.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["qcjson", "run", "-i", "job.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => panic!("expected 'run' subcommand"),
        }
    }

    #[test]
    fn file_values_are_loaded_and_defaults_fill_the_rest() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [backend]
            type = "command"
            program = "/opt/psi4/bin/psi4-json"
            args = ["--nthreads", "4"]
            creator = "Psi4"
            version = "1.9.1"

            [dispatch]
            timeout-secs = 120
            "#,
        );

        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&run_args(&[]))
            .unwrap();

        assert_eq!(
            config.backend,
            BackendSpec::Command {
                program: PathBuf::from("/opt/psi4/bin/psi4-json"),
                args: vec!["--nthreads".to_string(), "4".to_string()],
                working_dir: None,
                provenance: Some(Provenance::new("Psi4", "1.9.1", "command")),
            }
        );
        assert_eq!(
            config.dispatch,
            DispatchConfig {
                compute_timeout: Some(Duration::from_secs(120)),
                ..DispatchConfig::default()
            }
        );
        assert!(!config.pretty);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [backend]
            type = "command"
            program = "psi4-json"

            [dispatch]
            timeout-secs = 120

            [output]
            pretty = false
            "#,
        );

        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&run_args(&["--recorded", "he.toml", "--timeout", "2.5", "--pretty"]))
            .unwrap();

        assert_eq!(
            config.backend,
            BackendSpec::Recorded {
                path: PathBuf::from("he.toml")
            }
        );
        assert_eq!(config.dispatch.compute_timeout, Some(Duration::from_secs_f64(2.5)));
        assert!(config.pretty);
    }

    #[test]
    fn set_values_override_file_but_not_flags() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [backend]
            type = "recorded"
            path = "he.toml"

            [dispatch]
            timeout-secs = 120
            fill-derived-properties = true
            "#,
        );

        let args = run_args(&[
            "-S",
            "dispatch.fill-derived-properties=false",
            "-S",
            "dispatch.timeout-secs=60",
            "--timeout",
            "5",
        ]);
        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert!(!config.dispatch.fill_derived_properties);
        assert!(config.dispatch.validate_result_shape);
        assert_eq!(config.dispatch.compute_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn missing_backend_is_a_config_error() {
        let result = PartialRunConfig::default().merge_with_cli(&run_args(&[]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn non_positive_timeout_is_rejected() {
        let result = PartialRunConfig::default()
            .merge_with_cli(&run_args(&["--recorded", "he.toml", "--timeout", "0"]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn oversized_timeout_is_rejected() {
        for flag in ["1e30", "1e300"] {
            let result = PartialRunConfig::default()
                .merge_with_cli(&run_args(&["--recorded", "he.toml", "--timeout", flag]));
            assert!(matches!(result, Err(CliError::Config(_))), "accepted {flag}");
        }

        let args = run_args(&["--recorded", "he.toml", "-S", "dispatch.timeout-secs=1e30"]);
        let result = PartialRunConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn large_representable_timeout_is_accepted() {
        let config = PartialRunConfig::default()
            .merge_with_cli(&run_args(&["--recorded", "he.toml", "--timeout", "1e19"]))
            .unwrap();
        assert_eq!(config.dispatch.compute_timeout, Some(Duration::from_secs_f64(1e19)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[dispatch]\nretries = 3\n");
        let result = PartialRunConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["dispatch.timeout-secs", "output.pretty=maybe", "backend.type=command"] {
            let args = run_args(&["--recorded", "he.toml", "-S", bad]);
            let result = PartialRunConfig::default().merge_with_cli(&args);
            assert!(matches!(result, Err(CliError::Config(_))), "accepted '{bad}'");
        }
    }
}
