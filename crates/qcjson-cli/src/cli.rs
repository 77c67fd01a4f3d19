use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "qcjson contributors",
    version,
    about = "qcjson CLI - Validate QC_JSON job documents and run them through a quantum-chemistry backend.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads used when several documents are run at once.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more job documents through a backend and write the completed documents.
    Run(RunArgs),
    /// Check job documents without running them.
    Validate(ValidateArgs),
    /// Print the protocol name, supported schema versions and output keys.
    Schema,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Job document(s) to run. Several documents are processed in parallel.
    #[arg(short, long = "input", required = true, num_args(1..), value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Where to write the completed document. With several inputs this is a
    /// directory that receives one file per input. Defaults to stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Backend Overrides ---
    /// Run this program as the backend, overriding the config file.
    #[arg(long, value_name = "PROGRAM", conflicts_with = "recorded")]
    pub backend_command: Option<PathBuf>,

    /// Argument passed to the backend program. Can be used multiple times.
    #[arg(
        long = "backend-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        requires = "backend_command"
    )]
    pub backend_args: Vec<String>,

    /// Serve results from a TOML file of recorded computations, overriding the config file.
    #[arg(long, value_name = "PATH")]
    pub recorded: Option<PathBuf>,

    // --- Dispatch Overrides ---
    /// Cancel each computation after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Pretty-print the output documents.
    #[arg(long)]
    pub pretty: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S dispatch.timeout-secs=600
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Job document(s) to check.
    #[arg(short, long = "input", required = true, num_args(1..), value_name = "PATH")]
    pub inputs: Vec<PathBuf>,
}
