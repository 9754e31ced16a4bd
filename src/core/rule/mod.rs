//! The contract every plan step implements.
//!
//! Rules only reason about their own input and output slots. Everything that
//! needs the whole set of rules (mode inference, name resolution, ordering)
//! lives in [`crate::core::plan`] and [`crate::core::engine`].

pub mod declaration;
pub mod registry;

pub use declaration::{PlanDeclaration, RuleDeclaration};
pub use registry::{decode_rule, RuleFactory, RuleRegistry, RuleRegistryBuilder};

use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

fn default_strict() -> bool {
    true
}

/// Attributes shared by every rule kind. Flattened into each kind's
/// declaration next to its own attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    #[serde(default)]
    pub named_output: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl Default for RuleMeta {
    fn default() -> Self {
        Self {
            named_output: None,
            name: None,
            description: None,
            strict: true,
        }
    }
}

/// A slot a rule reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Main,
    Named(String),
}

impl Slot {
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) => Slot::Named(name.to_string()),
            None => Slot::Main,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Slot::Main => None,
            Slot::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Main => write!(f, "⟂"),
            Slot::Named(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Input shape of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleInputs {
    /// Produces data without reading any slot (file readers).
    Source,
    Unary(Option<String>),
    Binary {
        left: Option<String>,
        right: Option<String>,
    },
}

impl RuleInputs {
    pub fn takes_input(&self) -> bool {
        !matches!(self, RuleInputs::Source)
    }

    /// Every slot read by the rule, in reading order.
    pub fn slots(&self) -> Vec<Slot> {
        match self {
            RuleInputs::Source => Vec::new(),
            RuleInputs::Unary(input) => vec![Slot::from_name(input.as_deref())],
            RuleInputs::Binary { left, right } => vec![
                Slot::from_name(left.as_deref()),
                Slot::from_name(right.as_deref()),
            ],
        }
    }

    /// Configured input names, in reading order.
    pub fn named(&self) -> Vec<&str> {
        match self {
            RuleInputs::Source => Vec::new(),
            RuleInputs::Unary(input) => input.as_deref().into_iter().collect(),
            RuleInputs::Binary { left, right } => left
                .as_deref()
                .into_iter()
                .chain(right.as_deref())
                .collect(),
        }
    }

    /// True when at least one read falls back to the main slot.
    pub fn has_unnamed(&self) -> bool {
        self.slots().iter().any(|slot| *slot == Slot::Main)
    }
}

/// Trait implemented by every rule kind.
pub trait Rule: fmt::Debug + Send + Sync + 'static {
    /// Kind name used as the declaration key, e.g. `SortRule`.
    fn kind(&self) -> &'static str;

    fn meta(&self) -> &RuleMeta;

    fn inputs(&self) -> RuleInputs;

    /// Sinks (file writers) return `false`; they never write a slot.
    fn has_output(&self) -> bool {
        true
    }

    /// Read the declared input(s), transform, write the declared output.
    fn apply(&self, data: &mut RuleData) -> Result<(), AppError>;

    /// Declaration attributes, including the shared [`RuleMeta`] fields.
    fn attributes(&self) -> Result<Map<String, Value>, AppError>;

    /// Attributes ignored by [`same_rule`].
    fn excluded_from_compare(&self) -> &'static [&'static str] {
        &[]
    }

    fn rule_name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    fn rule_description(&self) -> Option<&str> {
        self.meta().description.as_deref()
    }

    fn named_output(&self) -> Option<&str> {
        self.meta().named_output.as_deref()
    }

    fn is_strict(&self) -> bool {
        self.meta().strict
    }

    /// `Kind/name`, or just `Kind` for unnamed rules.
    fn label(&self) -> String {
        match self.rule_name() {
            Some(name) => format!("{}/{}", self.kind(), name),
            None => self.kind().to_string(),
        }
    }

    /// Slot written by the rule, if any.
    fn output_slot(&self) -> Option<Slot> {
        if self.has_output() {
            Some(Slot::from_name(self.named_output()))
        } else {
            None
        }
    }

    fn to_declaration(&self) -> Result<RuleDeclaration, AppError> {
        Ok(RuleDeclaration::new(self.kind(), self.attributes()?))
    }

    /// Structural invariants: configured names are non-empty and a binary
    /// rule never reads the same slot twice.
    fn check_shape(&self) -> Result<(), AppError> {
        let shape_error = |message: String| {
            Err(AppError::new(ErrorCategory::Configuration, message).with_code("RG-RULE-001"))
        };
        if let Some(output) = self.named_output() {
            if output.is_empty() {
                return shape_error(format!("{} has an empty named_output", self.label()));
            }
            if !self.has_output() {
                return shape_error(format!(
                    "{} does not produce output but sets named_output={}",
                    self.label(),
                    output
                ));
            }
        }
        match self.inputs() {
            RuleInputs::Source => {}
            RuleInputs::Unary(input) => {
                if input.as_deref() == Some("") {
                    return shape_error(format!("{} has an empty named_input", self.label()));
                }
            }
            RuleInputs::Binary { left, right } => {
                if left.as_deref() == Some("") || right.as_deref() == Some("") {
                    return shape_error(format!(
                        "{} has an empty named_input_left/named_input_right",
                        self.label()
                    ));
                }
                if left == right {
                    return shape_error(format!(
                        "{} must read two different inputs (named_input_left != named_input_right)",
                        self.label()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Structural identity: same kind and same attributes, ignoring the ones the
/// kind excludes from comparison.
pub fn same_rule(a: &dyn Rule, b: &dyn Rule) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    let (Ok(mut left), Ok(mut right)) = (a.attributes(), b.attributes()) else {
        return false;
    };
    for key in a.excluded_from_compare() {
        left.remove(*key);
        right.remove(*key);
    }
    left == right
}

/// Serialise a rule's attributes as a JSON object.
pub fn encode_attributes<T: Serialize>(rule: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(rule) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::new(
            ErrorCategory::SerializationError,
            format!("rule attributes must encode to a mapping, got {}", other),
        )),
        Err(err) => Err(AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to encode rule attributes: {}", err),
        )),
    }
}

/// Fetch the table behind an input slot: main when `name` is `None`.
pub fn input_table<'a>(data: &'a RuleData, name: Option<&str>) -> Result<&'a Table, AppError> {
    match name {
        None => data.get_main_output(),
        Some(name) => data.get_named_output(name),
    }
}

/// Store a rule's result in its declared output slot.
pub fn set_output(meta: &RuleMeta, data: &mut RuleData, table: Table) {
    match &meta.named_output {
        None => data.set_main_output(table),
        Some(name) => data.set_named_output(name.clone(), table),
    }
}

/// Chainable setters for the shared [`RuleMeta`] fields.
macro_rules! meta_builders {
    ($ty:ty) => {
        impl $ty {
            pub fn named_output(mut self, name: impl Into<String>) -> Self {
                self.meta.named_output = Some(name.into());
                self
            }

            pub fn name(mut self, name: impl Into<String>) -> Self {
                self.meta.name = Some(name.into());
                self
            }

            pub fn description(mut self, description: impl Into<String>) -> Self {
                self.meta.description = Some(description.into());
                self
            }

            pub fn strict(mut self, strict: bool) -> Self {
                self.meta.strict = strict;
                self
            }
        }
    };
}

pub(crate) use meta_builders;
