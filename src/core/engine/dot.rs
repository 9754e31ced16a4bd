use crate::core::plan::Plan;
use crate::core::rule::Slot;
use crate::core::types::PlanMode;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

/// Node weight: either a rule or a named input nothing in the plan produces.
enum PlanGraphNode {
    Rule { index: usize, label: String },
    Input(String),
}

impl fmt::Display for PlanGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanGraphNode::Rule { index, label } => write!(f, "#{} {}", index, label),
            PlanGraphNode::Input(name) => write!(f, "input: {}", name),
        }
    }
}

struct SlotEdge(Slot);

impl fmt::Display for SlotEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn build_graph(plan: &Plan) -> DiGraph<PlanGraphNode, SlotEdge> {
    let mut graph = DiGraph::new();
    let rule_nodes: Vec<NodeIndex> = plan
        .rules()
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            graph.add_node(PlanGraphNode::Rule {
                index,
                label: rule.label(),
            })
        })
        .collect();

    let mut producers: HashMap<String, Vec<NodeIndex>> = HashMap::new();
    for (idx, rule) in plan.rules().iter().enumerate() {
        if let Some(output) = rule.named_output() {
            producers
                .entry(output.to_string())
                .or_default()
                .push(rule_nodes[idx]);
        }
    }

    let mut inputs: HashMap<String, NodeIndex> = HashMap::new();
    let mut last_main_writer: Option<NodeIndex> = None;
    for (idx, rule) in plan.rules().iter().enumerate() {
        for slot in rule.inputs().slots() {
            match &slot {
                Slot::Named(name) => match producers.get(name) {
                    Some(sources) => {
                        for &source in sources {
                            graph.add_edge(source, rule_nodes[idx], SlotEdge(slot.clone()));
                        }
                    }
                    None => {
                        let input = *inputs.entry(name.clone()).or_insert_with(|| {
                            graph.add_node(PlanGraphNode::Input(name.clone()))
                        });
                        graph.add_edge(input, rule_nodes[idx], SlotEdge(slot.clone()));
                    }
                },
                Slot::Main => {
                    if plan.mode() == Some(PlanMode::Pipeline) {
                        if let Some(source) = last_main_writer {
                            graph.add_edge(source, rule_nodes[idx], SlotEdge(Slot::Main));
                        }
                    }
                }
            }
        }
        if rule.output_slot() == Some(Slot::Main) {
            last_main_writer = Some(rule_nodes[idx]);
        }
    }

    graph
}

/// Render the plan's data flow as a Graphviz DOT string using petgraph.
///
/// Pipeline rules are chained through the main slot (`⟂`); graph rules are
/// linked by the named slot connecting them.
pub fn plan_to_dot(plan: &Plan) -> String {
    let graph = build_graph(plan);
    format!("{}", Dot::new(&graph))
}
