use rulegraph::core::backends::memory::{
    InnerJoinRule, ProjectRule, RenameRule, SortRule, WriteJsonFileRule,
};
use rulegraph::core::{ErrorCategory, Plan, PlanMode, RuleData, RuleEngine, Table};
use serde_json::json;

fn orders() -> Table {
    Table::from_records(&[
        json!({"id": 3, "customer": "c1", "amount": 30}),
        json!({"id": 1, "customer": "c2", "amount": 10}),
        json!({"id": 2, "customer": "c1", "amount": 20}),
    ])
    .unwrap()
}

fn customers() -> Table {
    Table::from_records(&[
        json!({"customer": "c1", "city": "Lisbon"}),
        json!({"customer": "c2", "city": "Oslo"}),
    ])
    .unwrap()
}

macro_rules! engine {
    ($($rule:expr),+ $(,)?) => {{
        let mut plan = Plan::new();
        $(plan.add_boxed_rule($rule).unwrap();)+
        RuleEngine::new(plan)
    }};
}

#[test]
fn pipeline_threads_the_main_slot_through_every_rule() {
    let engine = engine![
        Box::new(SortRule::new(["id"])),
        Box::new(ProjectRule::new(["id", "amount"])),
        Box::new(RenameRule::new([("amount", "total")])),
    ];
    let mut data = RuleData::with_main(orders());

    let summary = engine.run(&mut data).unwrap();

    assert_eq!(summary.mode, PlanMode::Pipeline);
    assert_eq!(summary.executed_indices(), vec![0, 1, 2]);
    let main = data.get_main_output().unwrap();
    assert_eq!(main.columns(), &["id".to_string(), "total".to_string()]);
    assert_eq!(
        main.to_records(),
        vec![
            json!({"id": 1, "total": 10}),
            json!({"id": 2, "total": 20}),
            json!({"id": 3, "total": 30}),
        ]
    );
}

#[test]
fn graph_run_writes_named_slots_and_leaves_main_unset() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("sorted"),
        ),
        Box::new(
            InnerJoinRule::new("sorted", "customers", ["customer"]).named_output("enriched"),
        ),
    ];
    let mut data = RuleData::with_named_inputs([("orders", orders()), ("customers", customers())]);

    let summary = engine.run(&mut data).unwrap();

    assert_eq!(summary.mode, PlanMode::Graph);
    assert!(!data.has_main_output());
    let enriched = data.get_named_output("enriched").unwrap();
    assert_eq!(
        enriched.to_records(),
        vec![
            json!({"id": 1, "customer": "c2", "amount": 10, "city": "Oslo"}),
            json!({"id": 2, "customer": "c1", "amount": 20, "city": "Lisbon"}),
            json!({"id": 3, "customer": "c1", "amount": 30, "city": "Lisbon"}),
        ]
    );
    // Inputs stay untouched.
    assert_eq!(data.get_named_output("orders").unwrap(), &orders());
}

#[test]
fn empty_plan_cannot_be_run() {
    let engine = RuleEngine::new(Plan::new());
    let mut data = RuleData::with_main(orders());

    let (valid, message) = engine.validate(&data);
    assert!(!valid);
    assert_eq!(message.as_deref(), Some("An empty plan cannot be run."));

    let err = engine.run(&mut data).unwrap_err();
    assert_eq!(err.category, ErrorCategory::InvalidPlan);
    assert_eq!(err.code, "RG-PLAN-001");
}

#[test]
fn plan_of_sinks_only_has_no_mode() {
    let engine = engine![Box::new(WriteJsonFileRule::new("out.jsonl", "/tmp"))];
    let (valid, message) = engine.validate(&RuleData::with_main(orders()));
    assert!(!valid);
    assert_eq!(message.as_deref(), Some("Plan's mode cannot be determined."));
}

#[test]
fn graph_rule_without_named_input_is_rejected() {
    let engine = engine![
        Box::new(SortRule::new(["id"]).named_output("sorted")),
    ];
    let (valid, message) = engine.validate(&RuleData::with_main(orders()));
    assert!(!valid);
    assert_eq!(message.as_deref(), Some("Rule SortRule has empty named input."));
}

#[test]
fn named_rule_appears_in_empty_named_input_message() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("sorted"),
        ),
        Box::new(WriteJsonFileRule::new("out.jsonl", "/tmp").name("dump")),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);
    let (_, message) = engine.validate(&data);
    assert_eq!(
        message.as_deref(),
        Some("Rule WriteJsonFileRule/dump has empty named input.")
    );
}

#[test]
fn missing_named_input_reports_the_rule_and_name() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("sorted"),
        ),
    ];
    let err = engine.check(&RuleData::default()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::GraphRuntime);
    assert_eq!(
        err.message,
        "Rule SortRule requires a named_input=orders which doesn't exist in the input data and it's not produced as a named output by any of the rules in the plan."
    );
}

#[test]
fn duplicate_named_outputs_are_rejected() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("result"),
        ),
        Box::new(
            ProjectRule::new(["id"])
                .named_input("orders")
                .named_output("result")
                .name("ids"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);
    let err = engine.check(&data).unwrap_err();
    assert_eq!(err.code, "RG-PLAN-005");
    assert_eq!(
        err.message,
        "Named output 'result' is produced by multiple rules: SortRule (rule #0), ProjectRule/ids (rule #1)"
    );
}

#[test]
fn outputs_clashing_with_inputs_are_listed() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("customers"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders()), ("customers", customers())]);
    let (valid, message) = engine.validate(&data);
    assert!(!valid);
    assert_eq!(
        message.as_deref(),
        Some("Named output clashes. The following named outputs are produced by rules in the plan but they also exist in the input data, leading to ambiguity: {'customers'}")
    );
}

#[test]
fn validate_never_applies_rules() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("sorted"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);

    assert_eq!(engine.validate(&data), (true, None));
    assert!(!data.has_named_output("sorted"));
}

#[test]
fn failing_rule_stops_the_run_and_carries_context() {
    let engine = engine![
        Box::new(SortRule::new(["id"])),
        Box::new(ProjectRule::new(["missing"]).name("pick")),
        Box::new(RenameRule::new([("id", "order_id")])),
    ];
    let mut data = RuleData::with_main(orders());

    let err = engine.run(&mut data).unwrap_err();

    assert_eq!(err.category, ErrorCategory::MissingColumn);
    assert_eq!(err.context.get("rule_index").map(String::as_str), Some("1"));
    assert_eq!(err.context.get("rule_kind").map(String::as_str), Some("ProjectRule"));
    assert_eq!(err.context.get("rule_name").map(String::as_str), Some("pick"));
    // The sort ran before the failure; the rename never did.
    let main = data.get_main_output().unwrap();
    assert!(main.has_column("id"));
    assert_eq!(main.rows()[0][0], json!(1));
}

#[test]
fn pipeline_without_main_input_fails_at_run_time() {
    let engine = engine![Box::new(SortRule::new(["id"]))];
    let mut data = RuleData::default();
    assert_eq!(engine.validate(&data), (true, None));

    let err = engine.run(&mut data).unwrap_err();
    assert_eq!(err.category, ErrorCategory::MissingMainOutput);
}

/// `run` must refuse with the message `validate` reports and leave the
/// context exactly as it was.
fn assert_run_refuses_like_validate(engine: &RuleEngine, data: &RuleData) {
    let (valid, message) = engine.validate(data);
    assert!(!valid);

    let mut run_data = data.clone();
    let err = engine.run(&mut run_data).unwrap_err();

    assert_eq!(Some(err.message), message);
    assert_eq!(run_data.into_parts(), data.clone().into_parts());
}

#[test]
fn validate_is_idempotent() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("result"),
        ),
        Box::new(
            ProjectRule::new(["id"])
                .named_input("orders")
                .named_output("result"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);

    let first = engine.validate(&data);
    let second = engine.validate(&data);
    assert!(!first.0);
    assert_eq!(first, second);

    let valid = engine![Box::new(SortRule::new(["id"]))];
    let data = RuleData::with_main(orders());
    assert_eq!(valid.validate(&data), valid.validate(&data));
}

#[test]
fn run_refuses_missing_inputs_without_touching_data() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("sorted"),
        ),
        Box::new(
            ProjectRule::new(["id"])
                .named_input("returns")
                .named_output("ids"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);
    assert_run_refuses_like_validate(&engine, &data);
}

#[test]
fn run_refuses_duplicate_outputs_without_touching_data() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("result"),
        ),
        Box::new(
            ProjectRule::new(["id"])
                .named_input("orders")
                .named_output("result"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders())]);
    assert_run_refuses_like_validate(&engine, &data);
}

#[test]
fn run_refuses_clashing_outputs_without_touching_data() {
    let engine = engine![
        Box::new(
            SortRule::new(["id"])
                .named_input("orders")
                .named_output("customers"),
        ),
    ];
    let data = RuleData::with_named_inputs([("orders", orders()), ("customers", customers())]);
    assert_run_refuses_like_validate(&engine, &data);
}

#[test]
fn pipeline_matches_the_same_steps_written_as_a_graph() {
    let input = Table::from_records(&[
        json!({"A": 2, "B": "b", "C": true}),
        json!({"A": 3, "B": "c", "C": false}),
        json!({"A": 1, "B": "a", "C": true}),
    ])
    .unwrap();

    let pipeline = engine![
        Box::new(SortRule::new(["A"])),
        Box::new(ProjectRule::new(["A", "B"])),
        Box::new(RenameRule::new([("A", "AA"), ("B", "BB")])),
    ];
    let mut pipeline_data = RuleData::with_main(input.clone());
    pipeline.run(&mut pipeline_data).unwrap();

    let graph = engine![
        Box::new(
            RenameRule::new([("A", "AA"), ("B", "BB")])
                .named_input("projected")
                .named_output("result"),
        ),
        Box::new(
            ProjectRule::new(["A", "B"])
                .named_input("sorted")
                .named_output("projected"),
        ),
        Box::new(
            SortRule::new(["A"])
                .named_input("input")
                .named_output("sorted"),
        ),
    ];
    let mut graph_data = RuleData::with_named_inputs([("input", input)]);
    let summary = graph.run(&mut graph_data).unwrap();
    assert_eq!(summary.mode, PlanMode::Graph);

    let expected = vec![
        json!({"AA": 1, "BB": "a"}),
        json!({"AA": 2, "BB": "b"}),
        json!({"AA": 3, "BB": "c"}),
    ];
    let from_pipeline = pipeline_data.get_main_output().unwrap();
    assert_eq!(from_pipeline.to_records(), expected);
    assert_eq!(graph_data.get_named_output("result").unwrap(), from_pipeline);
}
