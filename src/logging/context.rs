use crate::cli::{Command, OutputFormat};
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogContext {
    /// A person reading the terminal; diagnostics go to stderr.
    Interactive,
    /// Machine-readable output on stdout; the console sink stays silent.
    Quiet,
}

impl LogContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self) -> bool {
        matches!(self, LogContext::Quiet)
    }
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> LogContext {
    if quiet_override_enabled() {
        return LogContext::Quiet;
    }

    match command {
        Command::Graph(_) => LogContext::Quiet,
        Command::Validate(args) | Command::Explain(args) => match args.format {
            OutputFormat::Json => LogContext::Quiet,
            OutputFormat::Text => LogContext::Interactive,
        },
        Command::Run(args) => match args.plan.format {
            OutputFormat::Json => LogContext::Quiet,
            OutputFormat::Text => LogContext::Interactive,
        },
    }
}

fn quiet_override_enabled() -> bool {
    env::var("RULEGRAPH_QUIET")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
