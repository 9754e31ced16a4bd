#![allow(clippy::result_large_err)] // Plan construction returns AppError directly for structured diagnostics without boxing.

//! Ordered collection of rules plus the topology mode they imply.

use crate::core::error::AppError;
use crate::core::rule::{PlanDeclaration, Rule, RuleRegistry, Slot};
use crate::core::types::{ErrorCategory, PlanMode};
use serde::Serialize;
use std::path::Path;

/// Rule as seen by inspection tools: effective slots instead of raw attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanNode {
    pub index: usize,
    pub kind: String,
    pub name: Option<String>,
    pub inputs: Vec<Slot>,
    pub output: Option<Slot>,
    pub strict: bool,
}

/// Mode a rule reveals on its own, if any. Any named slot means graph mode;
/// sinks reveal nothing.
pub fn revealed_mode(rule: &dyn Rule) -> Option<PlanMode> {
    if !rule.has_output() {
        return None;
    }
    if rule.named_output().is_some() || !rule.inputs().named().is_empty() {
        Some(PlanMode::Graph)
    } else {
        Some(PlanMode::Pipeline)
    }
}

#[derive(Debug, Default)]
pub struct Plan {
    rules: Vec<Box<dyn Rule>>,
    mode: Option<PlanMode>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule<R: Rule>(&mut self, rule: R) -> Result<(), AppError> {
        self.add_boxed_rule(Box::new(rule))
    }

    /// Append a rule. The first rule revealing a mode fixes it; a later rule
    /// revealing the other mode is refused and the plan is left unchanged.
    pub fn add_boxed_rule(&mut self, rule: Box<dyn Rule>) -> Result<(), AppError> {
        rule.check_shape()?;
        if let Some(revealed) = revealed_mode(rule.as_ref()) {
            match self.mode {
                None => self.mode = Some(revealed),
                Some(current) if current != revealed => {
                    return Err(AppError::new(
                        ErrorCategory::InvalidPlan,
                        format!(
                            "Mode conflict: the plan is in {} mode but rule {} implies {} mode.",
                            current,
                            rule.label(),
                            revealed
                        ),
                    )
                    .with_code("RG-PLAN-003")
                    .with_suggestion(match revealed {
                        PlanMode::Graph => "remove named_input and named_output from this rule",
                        PlanMode::Pipeline => "set named_output on every rule that produces data",
                    }));
                }
                Some(_) => {}
            }
        }
        tracing::debug!(kind = rule.kind(), mode = ?self.mode, "rule added to plan");
        self.rules.push(rule);
        Ok(())
    }

    /// `None` while no rule has revealed a mode.
    pub fn mode(&self) -> Option<PlanMode> {
        self.mode
    }

    pub fn is_pipeline(&self) -> bool {
        self.mode == Some(PlanMode::Pipeline)
    }

    pub fn is_graph(&self) -> bool {
        self.mode == Some(PlanMode::Graph)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&dyn Rule> {
        self.rules.get(index).map(|rule| rule.as_ref())
    }

    pub fn nodes(&self) -> Vec<PlanNode> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| PlanNode {
                index,
                kind: rule.kind().to_string(),
                name: rule.rule_name().map(str::to_string),
                inputs: rule.inputs().slots(),
                output: rule.output_slot(),
                strict: rule.is_strict(),
            })
            .collect()
    }

    pub fn to_declaration(&self) -> Result<PlanDeclaration, AppError> {
        let rules = self
            .rules
            .iter()
            .map(|rule| rule.to_declaration())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlanDeclaration { rules })
    }

    /// Rebuild a plan, resolving every kind against `backend` in `registry`.
    pub fn from_declaration(
        declaration: &PlanDeclaration,
        backend: &str,
        registry: &RuleRegistry,
    ) -> Result<Self, AppError> {
        let mut plan = Plan::new();
        for (index, rule_declaration) in declaration.rules.iter().enumerate() {
            registry
                .instantiate(backend, rule_declaration)
                .and_then(|rule| plan.add_boxed_rule(rule))
                .map_err(|mut err| {
                    err.add_context("rule_index", &index.to_string());
                    err.add_context("rule_kind", &rule_declaration.kind);
                    err
                })?;
        }
        Ok(plan)
    }

    pub fn to_yaml(&self) -> Result<String, AppError> {
        self.to_declaration()?.to_yaml()
    }

    pub fn from_yaml(text: &str, backend: &str, registry: &RuleRegistry) -> Result<Self, AppError> {
        Self::from_declaration(&PlanDeclaration::parse(text)?, backend, registry)
    }
}

/// Read a plan document from disk and instantiate it.
pub fn load_plan(path: &Path, backend: &str, registry: &RuleRegistry) -> Result<Plan, AppError> {
    let declaration = PlanDeclaration::load_from_file(path)?;
    Plan::from_declaration(&declaration, backend, registry).map_err(|mut err| {
        err.add_context("path", &path.display().to_string());
        err
    })
}
