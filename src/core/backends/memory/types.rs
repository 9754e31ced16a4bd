#![allow(clippy::result_large_err)] // Rules return AppError directly for structured diagnostics without boxing.

use super::named_input_builder;
use super::validation::columns_in;
use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::rule::{
    encode_attributes, input_table, meta_builders, set_output, Rule, RuleInputs, RuleMeta,
};
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Cell types a column can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
    Bool,
}

impl FromStr for ColumnType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int64" => Ok(ColumnType::Int64),
            "float64" => Ok(ColumnType::Float64),
            "str" | "string" => Ok(ColumnType::Str),
            "bool" => Ok(ColumnType::Bool),
            other => Err(AppError::new(
                ErrorCategory::UnsupportedType,
                format!(
                    "Unsupported target type '{}'. Supported types: int64, float64, str, string, bool.",
                    other
                ),
            )
            .with_code("RG-MEM-003")),
        }
    }
}

impl ColumnType {
    /// Convert one cell. Nulls stay null.
    fn convert(self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            ColumnType::Int64 => to_int(value).map(Value::from),
            ColumnType::Float64 => to_float(value).and_then(Number::from_f64).map(Value::Number),
            ColumnType::Str => Some(Value::String(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            ColumnType::Bool => to_bool(value).map(Value::Bool),
        }
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Convert columns to the types named in `mapper` (column → type name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConversionRule {
    pub mapper: IndexMap<String, String>,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl TypeConversionRule {
    pub fn new<I, K, V>(mapper: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mapper: mapper
                .into_iter()
                .map(|(column, ty)| (column.into(), ty.into()))
                .collect(),
            named_input: None,
            meta: RuleMeta::default(),
        }
    }
}

meta_builders!(TypeConversionRule);
named_input_builder!(TypeConversionRule);

impl Rule for TypeConversionRule {
    fn kind(&self) -> &'static str {
        "TypeConversionRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let requested: Vec<String> = self.mapper.keys().cloned().collect();
        let columns = columns_in(table, &requested, self.is_strict())?;
        let targets = self
            .mapper
            .values()
            .map(|ty| ty.parse::<ColumnType>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut converted = table.clone();
        for column in &columns {
            let Some(position) = self.mapper.get_index_of(column) else {
                continue;
            };
            let target = targets[position];
            let values = converted
                .column_values(column)
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    target.convert(value).ok_or_else(|| {
                        AppError::new(
                            ErrorCategory::ValidationError,
                            format!(
                                "Cannot convert value {} in column '{}' (row {}) to {}.",
                                value, column, row, self.mapper[column]
                            ),
                        )
                        .with_code("RG-MEM-004")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            converted = converted.with_column(column, values)?;
        }
        set_output(&self.meta, data, converted);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}
