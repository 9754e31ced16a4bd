#![allow(clippy::result_large_err)] // Declaration parsing returns AppError to keep file and rule context without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// One rule as written in a plan document: `{Kind: {attr: value, ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDeclaration {
    pub kind: String,
    pub attributes: Map<String, Value>,
}

impl RuleDeclaration {
    pub fn new(kind: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            attributes,
        }
    }
}

impl Serialize for RuleDeclaration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.kind, &self.attributes)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleDeclaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Map<String, Value> = Map::deserialize(deserializer)?;
        if entries.len() != 1 {
            return Err(de::Error::custom(format!(
                "a rule declaration must have exactly one key (the rule kind), found {}",
                entries.len()
            )));
        }
        let Some((kind, attributes)) = entries.into_iter().next() else {
            return Err(de::Error::custom("empty rule declaration"));
        };
        let attributes = match attributes {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(de::Error::custom(format!(
                    "attributes of {} must be a mapping, found {}",
                    kind, other
                )))
            }
        };
        Ok(RuleDeclaration { kind, attributes })
    }
}

/// Ordered list of rule declarations; the document form of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanDeclaration {
    pub rules: Vec<RuleDeclaration>,
}

impl PlanDeclaration {
    /// Parse a YAML (or JSON) document.
    pub fn parse(text: &str) -> Result<Self, AppError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::Configuration,
                format!("failed to parse plan declaration: {}", err),
            )
            .with_code("RG-DECL-005")
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
            .with_code("RG-DECL-006")
        })?;
        Self::parse(&text).map_err(|mut err| {
            err.add_context("path", &path.display().to_string());
            err
        })
    }

    pub fn to_yaml(&self) -> Result<String, AppError> {
        serde_yaml::to_string(self).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("failed to encode plan declaration: {}", err),
            )
            .with_code("RG-DECL-007")
        })
    }
}
