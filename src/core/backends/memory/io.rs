#![allow(clippy::result_large_err)] // Rules return AppError directly for structured diagnostics without boxing.

//! JSON-lines readers and writers: one JSON object per line, one row per object.

use super::named_input_builder;
use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::rule::{
    encode_attributes, input_table, meta_builders, set_output, Rule, RuleInputs, RuleMeta,
};
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn default_file_dir() -> String {
    ".".to_string()
}

fn io_error(message: String, path: &Path) -> AppError {
    let mut err = AppError::new(ErrorCategory::IoError, message).with_code("RG-IO-001");
    err.add_context("path", &path.display().to_string());
    err
}

/// Parse a JSON-lines document. Blank lines are skipped.
pub fn parse_json_lines(text: &str, path: &Path) -> Result<Table, AppError> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(line).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!(
                    "{}:{}: invalid JSON line: {}",
                    path.display(),
                    line_no + 1,
                    err
                ),
            )
            .with_code("RG-IO-002")
        })?;
        records.push(record);
    }
    Table::from_records(&records).map_err(|err| {
        let mut err = AppError::from(err);
        err.add_context("path", &path.display().to_string());
        err
    })
}

pub fn read_json_lines(path: &Path) -> Result<Table, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(format!("failed to read {}: {}", path.display(), err), path))?;
    parse_json_lines(&text, path)
}

pub fn write_json_lines(table: &Table, path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            io_error(
                format!("failed to create {}: {}", parent.display(), err),
                parent,
            )
        })?;
    }
    let mut file = fs::File::create(path)
        .map_err(|err| io_error(format!("failed to create {}: {}", path.display(), err), path))?;
    for record in table.to_records() {
        let line = serde_json::to_string(&record).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to encode row: {}", err),
            )
        })?;
        writeln!(file, "{}", line)
            .map_err(|err| io_error(format!("failed to write {}: {}", path.display(), err), path))?;
    }
    Ok(())
}

/// Read one JSON-lines file, or with `regex` every file in `file_dir` whose
/// name matches `file_name` at its start, concatenated in name order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadJsonFileRule {
    pub file_name: String,
    #[serde(default = "default_file_dir")]
    pub file_dir: String,
    #[serde(default)]
    pub regex: bool,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl ReadJsonFileRule {
    pub fn new(file_name: impl Into<String>, file_dir: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_dir: file_dir.into(),
            regex: false,
            meta: RuleMeta::default(),
        }
    }

    pub fn regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    fn file_paths(&self) -> Result<Vec<PathBuf>, AppError> {
        let dir = Path::new(&self.file_dir);
        if !self.regex {
            return Ok(vec![dir.join(&self.file_name)]);
        }
        let pattern = Regex::new(&self.file_name).map_err(|err| {
            AppError::new(
                ErrorCategory::Configuration,
                format!("invalid file name pattern '{}': {}", self.file_name, err),
            )
            .with_code("RG-IO-003")
        })?;
        let entries = fs::read_dir(dir)
            .map_err(|err| io_error(format!("failed to list {}: {}", dir.display(), err), dir))?;
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| pattern.find(name).is_some_and(|m| m.start() == 0))
            .collect();
        names.sort();
        if names.is_empty() {
            return Err(io_error(
                format!(
                    "no file in {} matches '{}'",
                    dir.display(),
                    self.file_name
                ),
                dir,
            ));
        }
        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }
}

meta_builders!(ReadJsonFileRule);

impl Rule for ReadJsonFileRule {
    fn kind(&self) -> &'static str {
        "ReadJsonFileRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Source
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let mut result: Option<Table> = None;
        for path in self.file_paths()? {
            tracing::debug!(path = %path.display(), "reading json lines");
            let table = read_json_lines(&path)?;
            result = Some(match result {
                Some(acc) => acc.concat(&table),
                None => table,
            });
        }
        set_output(&self.meta, data, result.unwrap_or_default());
        Ok(())
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }

    fn excluded_from_compare(&self) -> &'static [&'static str] {
        &["file_dir"]
    }
}

/// Write the input table to `file_dir/file_name` as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteJsonFileRule {
    pub file_name: String,
    #[serde(default = "default_file_dir")]
    pub file_dir: String,
    #[serde(default)]
    pub named_input: Option<String>,
    #[serde(flatten)]
    pub meta: RuleMeta,
}

impl WriteJsonFileRule {
    pub fn new(file_name: impl Into<String>, file_dir: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_dir: file_dir.into(),
            named_input: None,
            meta: RuleMeta::default(),
        }
    }

    pub fn path(&self) -> PathBuf {
        Path::new(&self.file_dir).join(&self.file_name)
    }
}

meta_builders!(WriteJsonFileRule);
named_input_builder!(WriteJsonFileRule);

impl Rule for WriteJsonFileRule {
    fn kind(&self) -> &'static str {
        "WriteJsonFileRule"
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inputs(&self) -> RuleInputs {
        RuleInputs::Unary(self.named_input.clone())
    }

    fn has_output(&self) -> bool {
        false
    }

    fn apply(&self, data: &mut RuleData) -> Result<(), AppError> {
        let table = input_table(data, self.named_input.as_deref())?;
        let path = self.path();
        tracing::debug!(path = %path.display(), rows = table.row_count(), "writing json lines");
        write_json_lines(table, &path)
    }

    fn attributes(&self) -> Result<Map<String, Value>, AppError> {
        encode_attributes(self)
    }
}
