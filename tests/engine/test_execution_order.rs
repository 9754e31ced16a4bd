use insta::assert_snapshot;
use rulegraph::core::backends::memory::{
    LeftJoinRule, ProjectRule, RenameRule, SortRule, WriteJsonFileRule,
};
use rulegraph::core::engine::{build_explain_output, plan_to_dot, DependencyGraph};
use rulegraph::core::{ErrorCategory, Plan, RuleData, RuleEngine, Table};
use serde_json::json;
use tempfile::TempDir;

fn input() -> Table {
    Table::from_records(&[
        json!({"id": 2, "v": "b"}),
        json!({"id": 1, "v": "a"}),
    ])
    .unwrap()
}

/// Rules declared consumer-first: the last rule feeds the first.
fn reversed_plan() -> Plan {
    let mut plan = Plan::new();
    plan.add_rule(
        RenameRule::new([("v", "value")])
            .named_input("sorted")
            .named_output("renamed")
            .name("rename"),
    )
    .unwrap();
    plan.add_rule(
        SortRule::new(["id"])
            .named_input("projected")
            .named_output("sorted")
            .name("sort"),
    )
    .unwrap();
    plan.add_rule(
        ProjectRule::new(["id", "v"])
            .named_input("raw")
            .named_output("projected")
            .name("project"),
    )
    .unwrap();
    plan
}

#[test]
fn graph_mode_runs_producers_before_consumers() {
    let engine = RuleEngine::new(reversed_plan());
    let mut data = RuleData::with_named_inputs([("raw", input())]);

    assert_eq!(engine.execution_order(&data).unwrap(), vec![2, 1, 0]);
    let summary = engine.run(&mut data).unwrap();
    assert_eq!(summary.executed_indices(), vec![2, 1, 0]);

    let renamed = data.get_named_output("renamed").unwrap();
    assert_eq!(
        renamed.to_records(),
        vec![json!({"id": 1, "value": "a"}), json!({"id": 2, "value": "b"})]
    );
}

#[test]
fn independent_rules_keep_declaration_order() {
    let mut plan = Plan::new();
    plan.add_rule(SortRule::new(["id"]).named_input("raw").named_output("a"))
        .unwrap();
    plan.add_rule(SortRule::new(["v"]).named_input("raw").named_output("b"))
        .unwrap();
    plan.add_rule(LeftJoinRule::new("b", "a", ["id"]).named_output("joined"))
        .unwrap();
    plan.add_rule(ProjectRule::new(["id"]).named_input("raw").named_output("c"))
        .unwrap();

    let engine = RuleEngine::new(plan);
    let data = RuleData::with_named_inputs([("raw", input())]);
    assert_eq!(engine.execution_order(&data).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn pipeline_mode_runs_in_declaration_order() {
    let mut plan = Plan::new();
    plan.add_rule(SortRule::new(["id"])).unwrap();
    plan.add_rule(ProjectRule::new(["id"])).unwrap();
    let engine = RuleEngine::new(plan);
    assert_eq!(
        engine.execution_order(&RuleData::with_main(input())).unwrap(),
        vec![0, 1]
    );
}

#[test]
fn sink_runs_after_the_rule_it_reads() {
    let dir = TempDir::new().unwrap();
    let dir_path = dir.path().to_string_lossy().to_string();

    let mut plan = Plan::new();
    plan.add_rule(WriteJsonFileRule::new("sorted.jsonl", dir_path.as_str()).named_input("sorted"))
        .unwrap();
    plan.add_rule(SortRule::new(["id"]).named_input("raw").named_output("sorted"))
        .unwrap();

    let engine = RuleEngine::new(plan);
    let mut data = RuleData::with_named_inputs([("raw", input())]);
    engine.run(&mut data).unwrap();

    let written = std::fs::read_to_string(dir.path().join("sorted.jsonl")).unwrap();
    assert_eq!(
        written,
        "{\"id\":1,\"v\":\"a\"}\n{\"id\":2,\"v\":\"b\"}\n"
    );
}

#[test]
fn dependency_cycle_is_reported() {
    let mut plan = Plan::new();
    plan.add_rule(
        SortRule::new(["id"])
            .named_input("b")
            .named_output("a")
            .name("first"),
    )
    .unwrap();
    plan.add_rule(
        ProjectRule::new(["id"])
            .named_input("a")
            .named_output("b")
            .name("second"),
    )
    .unwrap();

    let graph = DependencyGraph::from_plan(&plan);
    assert_eq!(graph.cycles(), vec![vec![0, 1]]);
    assert_eq!(graph.topological_order(), Err(vec![0, 1]));

    let engine = RuleEngine::new(plan);
    let mut data = RuleData::default();
    let err = engine.run(&mut data).unwrap_err();
    assert_eq!(err.category, ErrorCategory::InvalidPlan);
    assert_eq!(err.code, "RG-PLAN-006");
    assert_eq!(
        err.message,
        "Plan contains a dependency cycle between rules: SortRule/first (rule #0), ProjectRule/second (rule #1)"
    );
}

#[test]
fn self_reading_rule_is_a_cycle() {
    let mut plan = Plan::new();
    plan.add_rule(SortRule::new(["id"]).named_input("loop").named_output("loop"))
        .unwrap();
    let graph = DependencyGraph::from_plan(&plan);
    assert_eq!(graph.cycles(), vec![vec![0]]);
    let (valid, _) = RuleEngine::new(plan).validate(&RuleData::default());
    assert!(!valid);
}

#[test]
fn dependency_queries_follow_named_slots() {
    let graph = DependencyGraph::from_plan(&reversed_plan());
    assert_eq!(graph.predecessors(0), vec![1]);
    assert_eq!(graph.successors(2), vec![1]);
    assert!(graph.predecessors(2).is_empty());
    assert_eq!(graph.graph().edge_count(), 2);
}

#[test]
fn explain_lists_order_and_dependencies() {
    let engine = RuleEngine::new(reversed_plan());
    let data = RuleData::with_named_inputs([("raw", Table::default())]);
    let output = build_explain_output(&engine, &data);

    assert!(output.valid);
    assert_eq!(output.execution_order, vec![2, 1, 0]);
    assert_eq!(output.rules[0].depends_on, vec![1]);
    assert_snapshot!(output.render_text(), @r###"
    mode: graph
    status: valid
    #0 RenameRule/rename [sorted] -> renamed
    #1 SortRule/sort [projected] -> sorted
    #2 ProjectRule/project [raw] -> projected
    order: 2 -> 1 -> 0
    "###);
}

#[test]
fn explain_reports_invalid_plans_without_order() {
    let engine = RuleEngine::new(reversed_plan());
    let output = build_explain_output(&engine, &RuleData::default());
    assert!(!output.valid);
    assert!(output.execution_order.is_empty());
    assert!(output
        .error
        .as_deref()
        .unwrap()
        .starts_with("Rule ProjectRule/project requires a named_input=raw"));
}

#[test]
fn dot_output_names_rules_and_slots() {
    let dot = plan_to_dot(&reversed_plan());
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("#1 SortRule/sort"));
    assert!(dot.contains("input: raw"));
    assert!(dot.contains("label = \"projected\""));
}
