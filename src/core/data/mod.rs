use crate::core::error::AppError;
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use indexmap::{IndexMap, IndexSet};

/// Run-time state threaded through a plan run: the unnamed main slot plus
/// named slots. Names supplied at construction are remembered as external
/// inputs so the engine can detect rules that would overwrite them.
#[derive(Debug, Clone, Default)]
pub struct RuleData {
    main: Option<Table>,
    named: IndexMap<String, Table>,
    external_inputs: IndexSet<String>,
}

impl RuleData {
    pub fn new(main: Option<Table>, named_inputs: IndexMap<String, Table>) -> Self {
        let external_inputs = named_inputs.keys().cloned().collect();
        Self {
            main,
            named: named_inputs,
            external_inputs,
        }
    }

    pub fn with_main(main: Table) -> Self {
        Self::new(Some(main), IndexMap::new())
    }

    pub fn with_named_inputs<I, S>(named_inputs: I) -> Self
    where
        I: IntoIterator<Item = (S, Table)>,
        S: Into<String>,
    {
        Self::new(
            None,
            named_inputs
                .into_iter()
                .map(|(name, table)| (name.into(), table))
                .collect(),
        )
    }

    pub fn get_main_output(&self) -> Result<&Table, AppError> {
        self.main.as_ref().ok_or_else(|| {
            AppError::new(
                ErrorCategory::MissingMainOutput,
                "The main output is not set. Supply a main input or add a rule that writes to it.",
            )
            .with_code("RG-DATA-001")
        })
    }

    pub fn has_main_output(&self) -> bool {
        self.main.is_some()
    }

    pub fn set_main_output(&mut self, table: Table) {
        self.main = Some(table);
    }

    pub fn get_named_output(&self, name: &str) -> Result<&Table, AppError> {
        self.named.get(name).ok_or_else(|| {
            AppError::new(
                ErrorCategory::MissingNamedOutput,
                format!("No such named output '{}'.", name),
            )
            .with_code("RG-DATA-002")
            .with_suggestion(format!(
                "available names: {}",
                self.named.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn has_named_output(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Create or overwrite a named slot.
    pub fn set_named_output(&mut self, name: impl Into<String>, table: Table) {
        self.named.insert(name.into(), table);
    }

    /// Names currently present, in insertion order.
    pub fn named_output_names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// Names supplied by the caller before the run.
    pub fn external_inputs(&self) -> &IndexSet<String> {
        &self.external_inputs
    }

    pub fn into_parts(self) -> (Option<Table>, IndexMap<String, Table>) {
        (self.main, self.named)
    }
}
