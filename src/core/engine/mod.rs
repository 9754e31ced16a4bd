#![allow(clippy::result_large_err)] // Engine APIs return AppError to carry rule context without boxing.

//! Structural validation and ordered execution of a [`Plan`].

pub mod dot;
pub mod explain;
pub mod graph;

pub use dot::plan_to_dot;
pub use explain::{build_explain_output, ExplainOutput};
pub use graph::DependencyGraph;

use crate::core::data::RuleData;
use crate::core::error::AppError;
use crate::core::plan::Plan;
use crate::core::rule::Rule;
use crate::core::types::{ErrorCategory, PlanMode};
use indexmap::IndexMap;
use serde::Serialize;
use std::time::Instant;

/// Timing record for one executed rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleRunRecord {
    pub index: usize,
    pub kind: String,
    pub name: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: PlanMode,
    pub rules: Vec<RuleRunRecord>,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn executed_indices(&self) -> Vec<usize> {
        self.rules.iter().map(|record| record.index).collect()
    }
}

pub struct RuleEngine {
    plan: Plan,
}

impl RuleEngine {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn into_plan(self) -> Plan {
        self.plan
    }

    /// Dry structural check: never mutates `data` and never applies a rule.
    /// On failure the message is the one [`RuleEngine::run`] would raise.
    pub fn validate(&self, data: &RuleData) -> (bool, Option<String>) {
        match self.check(data) {
            Ok(()) => (true, None),
            Err(err) => {
                tracing::debug!(code = %err.code, "plan validation failed: {}", err.message);
                (false, Some(err.message))
            }
        }
    }

    /// Like [`RuleEngine::validate`] but returns the structured error.
    pub fn check(&self, data: &RuleData) -> Result<(), AppError> {
        if self.plan.is_empty() {
            return Err(invalid_plan("An empty plan cannot be run.", "RG-PLAN-001"));
        }
        let Some(mode) = self.plan.mode() else {
            return Err(invalid_plan("Plan's mode cannot be determined.", "RG-PLAN-002")
                .with_suggestion("add a rule that produces output to fix the plan's mode"));
        };

        let external = data.external_inputs();
        let produced: IndexMap<&str, Vec<usize>> = self.producers();

        for rule in self.plan.rules() {
            let inputs = rule.inputs();
            if mode == PlanMode::Graph && inputs.takes_input() && inputs.has_unnamed() {
                return Err(invalid_plan(
                    format!("Rule {} has empty named input.", rule.label()),
                    "RG-PLAN-004",
                ));
            }
            for name in inputs.named() {
                if !external.contains(name) && !produced.contains_key(name) {
                    return Err(AppError::new(
                        ErrorCategory::GraphRuntime,
                        format!(
                            "Rule {} requires a named_input={} which doesn't exist in the input data and it's not produced as a named output by any of the rules in the plan.",
                            rule.label(),
                            name
                        ),
                    )
                    .with_code("RG-GRAPH-001"));
                }
            }
        }

        for (name, producers) in &produced {
            if producers.len() > 1 {
                let rules: Vec<String> = producers
                    .iter()
                    .map(|&idx| describe_rule(self.plan.rules()[idx].as_ref(), idx))
                    .collect();
                return Err(invalid_plan(
                    format!(
                        "Named output '{}' is produced by multiple rules: {}",
                        name,
                        rules.join(", ")
                    ),
                    "RG-PLAN-005",
                ));
            }
        }

        let clashes: Vec<String> = produced
            .keys()
            .filter(|name| external.contains(**name))
            .map(|name| format!("'{}'", name))
            .collect();
        if !clashes.is_empty() {
            return Err(AppError::new(
                ErrorCategory::GraphRuntime,
                format!(
                    "Named output clashes. The following named outputs are produced by rules in the plan but they also exist in the input data, leading to ambiguity: {{{}}}",
                    clashes.join(", ")
                ),
            )
            .with_code("RG-GRAPH-002"));
        }

        if mode == PlanMode::Graph {
            let cycles = DependencyGraph::from_plan(&self.plan).cycles();
            if let Some(cycle) = cycles.first() {
                let rules: Vec<String> = cycle
                    .iter()
                    .map(|&idx| describe_rule(self.plan.rules()[idx].as_ref(), idx))
                    .collect();
                return Err(invalid_plan(
                    format!(
                        "Plan contains a dependency cycle between rules: {}",
                        rules.join(", ")
                    ),
                    "RG-PLAN-006",
                ));
            }
        }

        Ok(())
    }

    /// Rule indices in the order [`RuleEngine::run`] applies them.
    pub fn execution_order(&self, data: &RuleData) -> Result<Vec<usize>, AppError> {
        self.check(data)?;
        match self.plan.mode() {
            Some(PlanMode::Graph) => DependencyGraph::from_plan(&self.plan)
                .topological_order()
                .map_err(|stuck| {
                    invalid_plan(
                        format!(
                            "Plan contains a dependency cycle between rules: {}",
                            stuck
                                .iter()
                                .map(|&idx| describe_rule(self.plan.rules()[idx].as_ref(), idx))
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                        "RG-PLAN-006",
                    )
                }),
            _ => Ok((0..self.plan.len()).collect()),
        }
    }

    /// Validate, then apply every rule in execution order. The first failing
    /// rule aborts the run; slots written before it stay in `data`.
    pub fn run(&self, data: &mut RuleData) -> Result<RunSummary, AppError> {
        let order = self.execution_order(data)?;
        let mode = self.plan.mode().unwrap_or(PlanMode::Pipeline);
        tracing::info!(%mode, rules = order.len(), "plan run started");

        let started = Instant::now();
        let mut records = Vec::with_capacity(order.len());
        for idx in order {
            let rule = self.plan.rules()[idx].as_ref();
            let span = tracing::info_span!(
                "rule",
                index = idx,
                kind = rule.kind(),
                name = rule.rule_name().unwrap_or("")
            );
            let _entered = span.enter();

            let rule_started = Instant::now();
            if let Err(mut err) = rule.apply(data) {
                err.add_context("rule_index", &idx.to_string());
                err.add_context("rule_kind", rule.kind());
                if let Some(name) = rule.rule_name() {
                    err.add_context("rule_name", name);
                }
                tracing::error!(code = %err.code, "rule failed: {}", err.message);
                return Err(err);
            }
            let duration_ms = rule_started.elapsed().as_millis() as u64;
            tracing::debug!(duration_ms, "rule applied");

            records.push(RuleRunRecord {
                index: idx,
                kind: rule.kind().to_string(),
                name: rule.rule_name().map(str::to_string),
                duration_ms,
            });
        }

        let total_duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(total_duration_ms, "plan run finished");
        Ok(RunSummary {
            mode,
            rules: records,
            total_duration_ms,
        })
    }

    /// Producers per named output, in order of first production.
    fn producers(&self) -> IndexMap<&str, Vec<usize>> {
        let mut produced: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (idx, rule) in self.plan.rules().iter().enumerate() {
            if let Some(output) = rule.named_output() {
                produced.entry(output).or_default().push(idx);
            }
        }
        produced
    }
}

fn invalid_plan(message: impl Into<String>, code: &str) -> AppError {
    AppError::new(ErrorCategory::InvalidPlan, message).with_code(code)
}

fn describe_rule(rule: &dyn Rule, index: usize) -> String {
    format!("{} (rule #{})", rule.label(), index)
}
