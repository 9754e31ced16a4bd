use crate::core::data::RuleData;
use crate::core::engine::{DependencyGraph, RuleEngine};
use crate::core::plan::PlanNode;
use crate::core::types::PlanMode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Output produced by `rulegraph explain`.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainOutput {
    pub mode: Option<PlanMode>,
    pub valid: bool,
    pub error: Option<String>,
    /// Empty when the plan does not validate.
    pub execution_order: Vec<usize>,
    pub rules: Vec<RuleExplain>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleExplain {
    #[serde(flatten)]
    pub node: PlanNode,
    pub depends_on: Vec<usize>,
    pub attributes: Value,
}

/// Build the explainability snapshot for a plan against the given inputs.
pub fn build_explain_output(engine: &RuleEngine, data: &RuleData) -> ExplainOutput {
    let plan = engine.plan();
    let graph = DependencyGraph::from_plan(plan);
    let (valid, error) = engine.validate(data);
    let execution_order = if valid {
        engine.execution_order(data).unwrap_or_default()
    } else {
        Vec::new()
    };

    let rules = plan
        .nodes()
        .into_iter()
        .zip(plan.rules())
        .map(|(node, rule)| RuleExplain {
            depends_on: graph.predecessors(node.index),
            attributes: Value::Object(rule.attributes().unwrap_or_else(|_| Map::new())),
            node,
        })
        .collect();

    ExplainOutput {
        mode: plan.mode(),
        valid,
        error,
        execution_order,
        rules,
    }
}

impl ExplainOutput {
    /// Human readable rendering used by the text output format.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mode = self
            .mode
            .map(|mode| mode.to_string())
            .unwrap_or_else(|| "undetermined".to_string());
        out.push_str(&format!("mode: {}\n", mode));
        match &self.error {
            None => out.push_str("status: valid\n"),
            Some(error) => out.push_str(&format!("status: invalid ({})\n", error)),
        }
        for rule in &self.rules {
            let inputs: Vec<String> = rule.node.inputs.iter().map(|s| s.to_string()).collect();
            let output = rule
                .node
                .output
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "#{} {}{} [{}] -> {}\n",
                rule.node.index,
                rule.node.kind,
                rule.node
                    .name
                    .as_ref()
                    .map(|n| format!("/{}", n))
                    .unwrap_or_default(),
                inputs.join(", "),
                output
            ));
        }
        if !self.execution_order.is_empty() {
            let order: Vec<String> = self.execution_order.iter().map(|i| i.to_string()).collect();
            out.push_str(&format!("order: {}\n", order.join(" -> ")));
        }
        out
    }
}
