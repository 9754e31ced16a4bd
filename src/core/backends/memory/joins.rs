#![allow(clippy::result_large_err)] // Rules return AppError directly for structured diagnostics without boxing.

//! Key-based joins between two input tables.
//!
//! Left columns come first. Non-key columns present on both sides get the
//! left/right suffix; right key columns named like their left counterpart are
//! merged into the left one. Rows follow the left input, except for right
//! joins, which follow the right input.

use super::validation::columns_in;
use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::rule::{
    encode_attributes, input_table, meta_builders, set_output, Rule, RuleInputs, RuleMeta,
};
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Which unmatched rows a join keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinHow {
    Left,
    Inner,
    Outer,
    Right,
}

pub trait JoinKind: Debug + Send + Sync + 'static {
    const KIND: &'static str;
    const HOW: JoinHow;
}

macro_rules! join_kind {
    ($marker:ident, $alias:ident, $kind:literal, $how:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $marker;

        impl JoinKind for $marker {
            const KIND: &'static str = $kind;
            const HOW: JoinHow = $how;
        }

        pub type $alias = JoinRule<$marker>;
    };
}

join_kind!(Left, LeftJoinRule, "LeftJoinRule", JoinHow::Left);
join_kind!(Inner, InnerJoinRule, "InnerJoinRule", JoinHow::Inner);
join_kind!(Outer, OuterJoinRule, "OuterJoinRule", JoinHow::Outer);
join_kind!(Right, RightJoinRule, "RightJoinRule", JoinHow::Right);

fn default_suffixes() -> [Option<String>; 2] {
    [Some("_x".to_string()), Some("_y".to_string())]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct JoinRule<K: JoinKind> {
    pub named_input_left: Option<String>,
    pub named_input_right: Option<String>,
    pub key_columns_left: Vec<String>,
    /// Defaults to `key_columns_left`.
    #[serde(default)]
    pub key_columns_right: Option<Vec<String>>,
    #[serde(default = "default_suffixes")]
    pub suffixes: [Option<String>; 2],
    #[serde(flatten)]
    pub meta: RuleMeta,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: JoinKind> JoinRule<K> {
    pub fn new<I, S>(
        named_input_left: impl Into<String>,
        named_input_right: impl Into<String>,
        key_columns_left: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            named_input_left: Some(named_input_left.into()),
            named_input_right: Some(named_input_right.into()),
            key_columns_left: key_columns_left.into_iter().map(Into::into).collect(),
            key_columns_right: None,
            suffixes: default_suffixes(),
            meta: RuleMeta::default(),
            kind: PhantomData,
        }
    }

    pub fn key_columns_right<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_columns_right = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn suffixes(mut self, left: Option<&str>, right: Option<&str>) -> Self {
        self.suffixes = [left.map(str::to_string), right.map(str::to_string)];
        self
    }

    fn key_columns(&self) -> (&[String], &[String]) {
        let right = self
            .key_columns_right
            .as_deref()
            .unwrap_or(self.key_columns_left.as_slice());
        (&self.key_columns_left, right)
    }
}

meta_builders!(JoinRule<Left>);
meta_builders!(JoinRule<Inner>);
meta_builders!(JoinRule<Outer>);
meta_builders!(JoinRule<Right>);

impl<K: JoinKind> Rule for JoinRule<K> {
    fn kind(&self) -> &'static str {
        K::KIND
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Binary {
            left: self.named_input_left.clone(),
            right: self.named_input_right.clone(),
        }
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let (left_keys, right_keys) = self.key_columns();
        if left_keys.is_empty() || left_keys.len() != right_keys.len() {
            return Err(AppError::new(
                ErrorCategory::Configuration,
                format!(
                    "{} needs the same non-zero number of left and right key columns.",
                    self.label()
                ),
            )
            .with_code("RG-MEM-006"));
        }
        let left = input_table(data, self.named_input_left.as_deref())?;
        let right = input_table(data, self.named_input_right.as_deref())?;
        columns_in(left, left_keys, true)?;
        columns_in(right, right_keys, true)?;

        let [suffix_left, suffix_right] = &self.suffixes;
        let joined = join(
            left,
            right,
            left_keys,
            right_keys,
            [suffix_left.as_deref(), suffix_right.as_deref()],
            K::HOW,
        )?;
        tracing::debug!(rows = joined.row_count(), "join produced rows");
        set_output(&self.meta, data, joined);
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}

fn suffixed(column: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}{}", column, suffix),
        None => column.to_string(),
    }
}

fn key_of(row: &[Value], positions: &[usize]) -> String {
    let key: Vec<&Value> = positions.iter().map(|&idx| &row[idx]).collect();
    serde_json::to_string(&key).unwrap_or_default()
}

fn index_rows(table: &Table, key_positions: &[usize]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        index
            .entry(key_of(row, key_positions))
            .or_default()
            .push(row_idx);
    }
    index
}

fn join(
    left: &Table,
    right: &Table,
    left_keys: &[String],
    right_keys: &[String],
    suffixes: [Option<&str>; 2],
    how: JoinHow,
) -> Result<Table, AppError> {
    let left_key_pos: Vec<usize> = left_keys
        .iter()
        .filter_map(|c| left.column_index(c))
        .collect();
    let right_key_pos: Vec<usize> = right_keys
        .iter()
        .filter_map(|c| right.column_index(c))
        .collect();
    // Right key columns merged into the left key column of the same name.
    let merged: Vec<(usize, usize)> = left_keys
        .iter()
        .zip(right_keys)
        .zip(left_key_pos.iter().zip(&right_key_pos))
        .filter(|((l, r), _)| l == r)
        .map(|(_, (&l, &r))| (l, r))
        .collect();
    let merged_right: Vec<usize> = merged.iter().map(|&(_, r)| r).collect();
    let merged_names: Vec<&String> = merged.iter().map(|&(l, _)| &left.columns()[l]).collect();

    let mut columns: Vec<String> = Vec::new();
    for column in left.columns() {
        if right.has_column(column) && !merged_names.contains(&column) {
            columns.push(suffixed(column, suffixes[0]));
        } else {
            columns.push(column.clone());
        }
    }
    let right_kept: Vec<usize> = (0..right.columns().len())
        .filter(|idx| !merged_right.contains(idx))
        .collect();
    for &idx in &right_kept {
        let column = &right.columns()[idx];
        if left.has_column(column) {
            columns.push(suffixed(column, suffixes[1]));
        } else {
            columns.push(column.clone());
        }
    }

    let joined_row = |left_row: &Vec<Value>, right_row: &Vec<Value>| -> Vec<Value> {
        let mut row = left_row.clone();
        row.extend(right_kept.iter().map(|&idx| right_row[idx].clone()));
        row
    };
    let left_missing = |right_row: &Vec<Value>| -> Vec<Value> {
        let mut row = vec![Value::Null; left.columns().len()];
        for &(l, r) in &merged {
            row[l] = right_row[r].clone();
        }
        row.extend(right_kept.iter().map(|&idx| right_row[idx].clone()));
        row
    };
    let right_missing = |left_row: &Vec<Value>| -> Vec<Value> {
        let mut row = left_row.clone();
        row.extend(right_kept.iter().map(|_| Value::Null));
        row
    };

    let mut rows: Vec<Vec<Value>> = Vec::new();
    if how == JoinHow::Right {
        // Row order follows the right input.
        let index = index_rows(left, &left_key_pos);
        for right_row in right.rows() {
            match index.get(&key_of(right_row, &right_key_pos)) {
                Some(matches) => rows.extend(
                    matches
                        .iter()
                        .map(|&left_idx| joined_row(&left.rows()[left_idx], right_row)),
                ),
                None => rows.push(left_missing(right_row)),
            }
        }
    } else {
        let index = index_rows(right, &right_key_pos);
        let mut matched_right = vec![false; right.row_count()];
        for left_row in left.rows() {
            match index.get(&key_of(left_row, &left_key_pos)) {
                Some(matches) => {
                    for &right_idx in matches {
                        matched_right[right_idx] = true;
                        rows.push(joined_row(left_row, &right.rows()[right_idx]));
                    }
                }
                None if how != JoinHow::Inner => rows.push(right_missing(left_row)),
                None => {}
            }
        }
        if how == JoinHow::Outer {
            for (right_idx, right_row) in right.rows().iter().enumerate() {
                if !matched_right[right_idx] {
                    rows.push(left_missing(right_row));
                }
            }
        }
    }

    Table::from_rows(columns, rows).map_err(|err| {
        AppError::new(
            ErrorCategory::ColumnAlreadyExists,
            format!("join produced clashing column names: {}", err),
        )
        .with_code("RG-MEM-002")
        .with_suggestion("set distinct suffixes for the left and right inputs")
    })
}
