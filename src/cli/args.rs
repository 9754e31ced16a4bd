use clap::Args;
use std::path::PathBuf;

/// Parse `NAME=PATH` pairs used by `--input` and `--output`.
pub fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("expected NAME=PATH, got '{}'", value)),
    }
}

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Plan document: a YAML (or JSON) list of {RuleKind: {attributes}} entries
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Backend that resolves rule kinds (default: engine.default_backend, then memory)
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,

    /// Workspace holding rulegraph.toml and .rulegraph/ (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// JSON-lines file loaded into the main slot
    #[arg(long, value_name = "PATH", help_heading = "Inputs")]
    pub main_input: Option<PathBuf>,

    /// JSON-lines file loaded into a named slot; repeatable
    #[arg(
        long = "input",
        value_name = "NAME=PATH",
        value_parser = parse_named_path,
        help_heading = "Inputs"
    )]
    pub inputs: Vec<(String, PathBuf)>,

    /// Emit either terminal-friendly text or machine-readable JSON
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, value_name = "FORMAT")]
    pub format: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Write the main slot to this JSON-lines file after the run
    #[arg(long, value_name = "PATH", help_heading = "Outputs")]
    pub main_output: Option<PathBuf>,

    /// Write a named slot to a JSON-lines file after the run; repeatable
    #[arg(
        long = "output",
        value_name = "NAME=PATH",
        value_parser = parse_named_path,
        help_heading = "Outputs"
    )]
    pub outputs: Vec<(String, PathBuf)>,
}

#[derive(Args, Clone, Debug)]
pub struct GraphArgs {
    /// Plan document to render
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Backend that resolves rule kinds
    #[arg(long, value_name = "NAME")]
    pub backend: Option<String>,

    /// Workspace holding rulegraph.toml and .rulegraph/
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON payload suitable for downstream tooling
    Json,
}
