//! Row-oriented in-memory table used by the bundled `memory` backend.
//!
//! Cells are `serde_json::Value`s so tables load from and dump to JSON lines
//! without a schema. Column order is significant and preserved by every
//! operation.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

/// Failures raised by table-level operations before they are mapped to [`AppError`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' is duplicated")]
    DuplicateColumn(String),

    #[error("row {0} is not a JSON object")]
    NotAnObject(usize),
}

impl From<TableError> for AppError {
    fn from(err: TableError) -> Self {
        let category = match err {
            TableError::DuplicateColumn(_) => ErrorCategory::ColumnAlreadyExists,
            TableError::RowWidth { .. } | TableError::NotAnObject(_) => {
                ErrorCategory::SerializationError
            }
        };
        AppError::new(category, err.to_string()).with_code("RG-TABLE-001")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].contains(column) {
                return Err(TableError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from positional rows.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from JSON objects. Columns appear in first-seen order and
    /// objects lacking a column get `null` for it.
    pub fn from_records(records: &[Value]) -> Result<Self, TableError> {
        let mut columns: Vec<String> = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or(TableError::NotAnObject(idx))?;
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .iter()
            .filter_map(Value::as_object)
            .map(|object| {
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok(Self { columns, rows })
    }

    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, value) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), value.clone());
                }
                Value::Object(object)
            })
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Keep only `columns`, in the given order. Unknown names are skipped.
    pub fn select(&self, columns: &[String]) -> Table {
        let indices: Vec<(String, usize)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|idx| (c.clone(), idx)))
            .collect();
        Table {
            columns: indices.iter().map(|(c, _)| c.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|(_, idx)| row[*idx].clone()).collect())
                .collect(),
        }
    }

    /// Rename columns in place; names absent from `mapping` are kept.
    pub fn rename<F>(&self, mut mapping: F) -> Result<Table, TableError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| mapping(c).unwrap_or_else(|| c.clone()))
            .collect();
        Table::from_rows(columns, self.rows.clone())
    }

    /// Stable multi-key sort. `keys` are column indices.
    pub fn sorted_by(&self, keys: &[usize], ascending: bool) -> Table {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            for &key in keys {
                let ordering = compare_values(&a[key], &b[key], ascending);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Replace the values of `column` (appending it when missing).
    pub fn with_column(&self, column: &str, values: Vec<Value>) -> Result<Table, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowWidth {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let mut table = self.clone();
        match table.column_index(column) {
            Some(idx) => {
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                table.columns.push(column.to_string());
                for (row, value) in table.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(table)
    }

    /// Append the rows of `other`, aligning by column name. Columns missing
    /// from either side are filled with `null`.
    pub fn concat(&self, other: &Table) -> Table {
        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        let align = |table: &Table| -> Vec<Vec<Value>> {
            let positions: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            table
                .rows
                .iter()
                .map(|row| {
                    positions
                        .iter()
                        .map(|pos| pos.map(|idx| row[idx].clone()).unwrap_or(Value::Null))
                        .collect()
                })
                .collect()
        };
        let mut rows = align(self);
        rows.extend(align(other));
        Table { columns, rows }
    }
}

/// Total order over JSON cells: nulls last, then booleans, numbers, strings,
/// and anything else by its serialised form.
pub fn compare_values(a: &Value, b: &Value, ascending: bool) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => {
            let ordering = match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => type_rank(a)
                    .cmp(&type_rank(b))
                    .then_with(|| a.to_string().cmp(&b.to_string())),
            };
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 5,
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
    }
}
