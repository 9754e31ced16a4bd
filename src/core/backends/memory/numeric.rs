#![allow(clippy::result_large_err)] // Rules return AppError directly for structured diagnostics without boxing.

use super::named_input_builder;
use super::validation::{column_out, columns_in};
use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::rule::{
    encode_attributes, input_table, meta_builders, set_output, Rule, RuleInputs, RuleMeta,
};
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Apply `op` to every cell of `input_column`, writing into `output_column`
/// (the input column itself when unset).
fn map_numeric_column<F>(
    table: &Table,
    input_column: &str,
    output_column: Option<&str>,
    strict: bool,
    op: F,
) -> Result<Option<Table>, AppError>
where
    F: Fn(&Number) -> Option<Value>,
{
    let found = columns_in(table, &[input_column.to_string()], strict)?;
    if found.is_empty() {
        return Ok(None);
    }
    let output = column_out(table, input_column, output_column, strict)?;
    let values = table
        .column_values(input_column)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => op(n).ok_or_else(|| non_numeric(input_column, row, value)),
            other => Err(non_numeric(input_column, row, other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(table.with_column(&output, values)?))
}

fn non_numeric(column: &str, row: usize, value: &Value) -> AppError {
    AppError::new(
        ErrorCategory::UnsupportedType,
        format!(
            "Column '{}' holds a non-numeric value {} at row {}.",
            column, value, row
        ),
    )
    .with_code("RG-MEM-005")
}

/// Round half to even at `scale` decimal places (negative scales round to
/// tens, hundreds, ...). Integers keep their type unless the scale is negative.
fn round_number(n: &Number, scale: i32) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        if scale >= 0 {
            return Some(Value::from(i));
        }
        let factor = 10_f64.powi(-scale);
        let rounded = ((i as f64) / factor).round_ties_even() * factor;
        return Some(Value::from(rounded as i64));
    }
    let f = n.as_f64()?;
    let factor = 10_f64.powi(scale);
    let rounded = (f * factor).round_ties_even() / factor;
    Number::from_f64(rounded).map(Value::Number)
}

fn abs_number(n: &Number) -> Option<Value> {
    if n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    if let Some(i) = n.as_i64() {
        return Some(match i.checked_abs() {
            Some(abs) => Value::from(abs),
            None => Value::from(i.unsigned_abs()),
        });
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(f.abs()))
        .map(Value::Number)
}

/// Round a numeric column to `scale` decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRule {
    pub input_column: String,
    #[serde(default)]
    pub scale: i32,
    #[serde(default)]
    pub output_column: Option<String>,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl RoundRule {
    pub fn new(input_column: impl Into<String>, scale: i32) -> Self {
        Self {
            input_column: input_column.into(),
            scale,
            output_column: None,
            named_input: None,
            meta: RuleMeta::default(),
        }
    }

    pub fn output_column(mut self, column: impl Into<String>) -> Self {
        self.output_column = Some(column.into());
        self
    }
}

meta_builders!(RoundRule);
named_input_builder!(RoundRule);

impl Rule for RoundRule {
    fn kind(&self) -> &'static str {
        "RoundRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let scale = self.scale;
        let result = map_numeric_column(
            table,
            &self.input_column,
            self.output_column.as_deref(),
            self.is_strict(),
            |n| round_number(n, scale),
        )?
        .unwrap_or_else(|| table.clone());
        set_output(&self.meta, data, result);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}

/// Absolute value of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsRule {
    pub input_column: String,
    #[serde(default)]
    pub output_column: Option<String>,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl AbsRule {
    pub fn new(input_column: impl Into<String>) -> Self {
        Self {
            input_column: input_column.into(),
            output_column: None,
            named_input: None,
            meta: RuleMeta::default(),
        }
    }

    pub fn output_column(mut self, column: impl Into<String>) -> Self {
        self.output_column = Some(column.into());
        self
    }
}

meta_builders!(AbsRule);
named_input_builder!(AbsRule);

impl Rule for AbsRule {
    fn kind(&self) -> &'static str {
        "AbsRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let result = map_numeric_column(
            table,
            &self.input_column,
            self.output_column.as_deref(),
            self.is_strict(),
            abs_number,
        )?
        .unwrap_or_else(|| table.clone());
        set_output(&self.meta, data, result);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}
