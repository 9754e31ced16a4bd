#![allow(clippy::result_large_err)] // Rules return AppError directly for structured diagnostics without boxing.

use super::named_input_builder;
use super::validation::{columns_in, one_or_many, set_repr};
use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::rule::{
    encode_attributes, input_table, meta_builders, set_output, Rule, RuleInputs, RuleMeta,
};
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_ascending() -> bool {
    true
}

/// Stable sort by one or more columns. Nulls sort last in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRule {
    #[serde(deserialize_with = "one_or_many")]
    pub sort_by: Vec<String>,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl SortRule {
    pub fn new<I, S>(sort_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sort_by: sort_by.into_iter().map(Into::into).collect(),
            ascending: true,
            named_input: None,
            meta: RuleMeta::default(),
        }
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }
}

meta_builders!(SortRule);
named_input_builder!(SortRule);

impl Rule for SortRule {
    fn kind(&self) -> &'static str {
        "SortRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let columns = columns_in(table, &self.sort_by, self.is_strict())?;
        let keys: Vec<usize> = columns
            .iter()
            .filter_map(|column| table.column_index(column))
            .collect();
        let sorted = table.sorted_by(&keys, self.ascending);
        set_output(&self.meta, data, sorted);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}

/// Keep (or, with `exclude`, drop) a list of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRule {
    #[serde(deserialize_with = "one_or_many")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub exclude: bool,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl ProjectRule {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            exclude: false,
            named_input: None,
            meta: RuleMeta::default(),
        }
    }

    pub fn exclude(mut self, exclude: bool) -> Self {
        self.exclude = exclude;
        self
    }
}

meta_builders!(ProjectRule);
named_input_builder!(ProjectRule);

impl Rule for ProjectRule {
    fn kind(&self) -> &'static str {
        "ProjectRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let columns = columns_in(table, &self.columns, self.is_strict())?;
        let keep: Vec<String> = if self.exclude {
            table
                .columns()
                .iter()
                .filter(|column| !columns.contains(column))
                .cloned()
                .collect()
        } else {
            columns
        };
        let projected = table.select(&keep);
        set_output(&self.meta, data, projected);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}

/// Rename columns according to `mapper` (old name → new name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRule {
    pub mapper: IndexMap<String, String>,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl RenameRule {
    pub fn new<I, K, V>(mapper: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mapper: mapper
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
            named_input: None,
            meta: RuleMeta::default(),
        }
    }
}

meta_builders!(RenameRule);
named_input_builder!(RenameRule);

impl Rule for RenameRule {
    fn kind(&self) -> &'static str {
        "RenameRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let sources: Vec<String> = self.mapper.keys().cloned().collect();
        columns_in(table, &sources, self.is_strict())?;
        let renamed = table
            .rename(|column| self.mapper.get(column).cloned())
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ColumnAlreadyExists,
                    format!(
                        "Renaming {} produces a duplicate column: {}",
                        set_repr(&sources),
                        err
                    ),
                )
                .with_code("RG-MEM-002")
            })?;
        set_output(&self.meta, data, renamed);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}
