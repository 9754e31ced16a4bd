use crate::core::plan::Plan;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Producer → consumer edges between rules, keyed by declaration index.
///
/// Edge weights carry the named slot that links the two rules.
pub struct DependencyGraph {
    graph: DiGraph<usize, String>,
    nodes: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn from_plan(plan: &Plan) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..plan.len()).map(|idx| graph.add_node(idx)).collect();

        let mut producers: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, rule) in plan.rules().iter().enumerate() {
            if let Some(output) = rule.named_output() {
                producers.entry(output).or_default().push(idx);
            }
        }

        for (consumer, rule) in plan.rules().iter().enumerate() {
            let inputs = rule.inputs();
            for name in inputs.named() {
                for &producer in producers.get(name).into_iter().flatten() {
                    graph.add_edge(nodes[producer], nodes[consumer], name.to_string());
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn graph(&self) -> &DiGraph<usize, String> {
        &self.graph
    }

    /// Rules whose outputs `index` reads.
    pub fn predecessors(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Incoming)
    }

    /// Rules reading the output of `index`.
    pub fn successors(&self, index: usize) -> Vec<usize> {
        self.neighbors(index, Direction::Outgoing)
    }

    fn neighbors(&self, index: usize, direction: Direction) -> Vec<usize> {
        let Some(&node) = self.nodes.get(index) else {
            return Vec::new();
        };
        let mut found: Vec<usize> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n])
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Kahn's algorithm; among ready rules the earliest declared runs first.
    ///
    /// On a cycle, returns the indices that could not be scheduled.
    pub fn topological_order(&self) -> Result<Vec<usize>, Vec<usize>> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .iter()
            .map(|&node| {
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut scheduled = vec![false; self.nodes.len()];
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            scheduled[idx] = true;
            for next in self.graph.neighbors_directed(self.nodes[idx], Direction::Outgoing) {
                let next = self.graph[next];
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            Err((0..self.nodes.len()).filter(|&idx| !scheduled[idx]).collect())
        }
    }

    /// Strongly connected components that form cycles (including self loops),
    /// each sorted by declaration index.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut members: Vec<usize> = component.iter().map(|&n| self.graph[n]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}
