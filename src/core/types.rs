use serde::{Deserialize, Serialize};
use std::fmt;

/// Topology a plan settles into once a rule reveals it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    Pipeline,
    Graph,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanMode::Pipeline => write!(f, "pipeline"),
            PlanMode::Graph => write!(f, "graph"),
        }
    }
}

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Plan shape is unusable (empty, mixed modes, duplicate outputs, cycles).
    InvalidPlan,
    /// Named slots cannot be resolved against the data supplied to a run.
    GraphRuntime,
    MissingColumn,
    ColumnAlreadyExists,
    UnsupportedType,
    MissingNamedOutput,
    MissingMainOutput,
    /// Unknown backend or rule kind, malformed declaration or config file.
    Configuration,
    ValidationError,
    SerializationError,
    IoError,
    InternalError,
    Unknown,
}

impl ErrorCategory {
    /// Structural categories are detected by validation before any rule runs.
    pub fn is_structural(&self) -> bool {
        matches!(self, ErrorCategory::InvalidPlan | ErrorCategory::GraphRuntime)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}
