use rulegraph::core::backends::memory::{
    InnerJoinRule, ReadJsonFileRule, RoundRule, SortRule, TypeConversionRule, BACKEND,
};
use rulegraph::core::rule::decode_rule;
use rulegraph::core::{
    load_plan, same_rule, ErrorCategory, Plan, PlanDeclaration, PlanMode, Rule, RuleDeclaration,
    RuleRegistry,
};
use serde_json::{json, Map};
use std::fs;
use tempfile::TempDir;

const PLAN_YAML: &str = r#"
- ReadJsonFileRule:
    file_name: orders.jsonl
    file_dir: /data
    named_output: orders
- SortRule:
    sort_by: amount
    ascending: false
    named_input: orders
    named_output: sorted
    name: by amount
- RoundRule:
    input_column: amount
    scale: 1
    named_input: sorted
    named_output: rounded
    strict: false
"#;

#[test]
fn plan_document_builds_rules_in_order() {
    let registry = RuleRegistry::with_builtins();
    let plan = Plan::from_yaml(PLAN_YAML, BACKEND, &registry).unwrap();

    assert_eq!(plan.len(), 3);
    assert_eq!(plan.mode(), Some(PlanMode::Graph));
    let kinds: Vec<&str> = plan.rules().iter().map(|rule| rule.kind()).collect();
    assert_eq!(kinds, vec!["ReadJsonFileRule", "SortRule", "RoundRule"]);

    let sort = plan.rule(1).unwrap();
    assert_eq!(sort.rule_name(), Some("by amount"));
    assert_eq!(sort.label(), "SortRule/by amount");
    assert!(!plan.rule(2).unwrap().is_strict());
}

#[test]
fn yaml_round_trip_preserves_every_rule() {
    let registry = RuleRegistry::with_builtins();
    let plan = Plan::from_yaml(PLAN_YAML, BACKEND, &registry).unwrap();

    let encoded = plan.to_yaml().unwrap();
    let reloaded = Plan::from_yaml(&encoded, BACKEND, &registry).unwrap();

    assert_eq!(reloaded.len(), plan.len());
    for (a, b) in plan.rules().iter().zip(reloaded.rules()) {
        assert!(same_rule(a.as_ref(), b.as_ref()), "{} changed", a.kind());
    }
    assert_eq!(
        reloaded.to_declaration().unwrap(),
        plan.to_declaration().unwrap()
    );
}

#[test]
fn declaration_lists_every_attribute_under_the_kind() {
    let rule = SortRule::new(["A", "B"]).ascending(false).named_output("out");
    let declaration = rule.to_declaration().unwrap();

    assert_eq!(declaration.kind, "SortRule");
    assert_eq!(
        serde_json::to_value(&declaration).unwrap(),
        json!({
            "SortRule": {
                "sort_by": ["A", "B"],
                "ascending": false,
                "named_input": null,
                "named_output": "out",
                "name": null,
                "description": null,
                "strict": true
            }
        })
    );
}

#[test]
fn rule_declaration_needs_exactly_one_key() {
    let err = PlanDeclaration::parse("- SortRule: {sort_by: A}\n  ProjectRule: {columns: A}\n")
        .unwrap_err();
    assert_eq!(err.code, "RG-DECL-005");
    assert!(err.message.contains("exactly one key"));
}

#[test]
fn null_attributes_mean_defaults() {
    let declaration = PlanDeclaration::parse("- SortRule:\n").unwrap();
    assert_eq!(declaration.rules, vec![RuleDeclaration::new("SortRule", Map::new())]);

    // SortRule still needs sort_by.
    let err = RuleRegistry::with_builtins()
        .instantiate(BACKEND, &declaration.rules[0])
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::Configuration);
    assert_eq!(err.code, "RG-DECL-003");
}

#[test]
fn empty_document_is_an_empty_plan() {
    let plan = Plan::from_yaml("  \n", BACKEND, &RuleRegistry::with_builtins()).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn unknown_backend_and_kind_are_configuration_errors() {
    let registry = RuleRegistry::with_builtins();

    let err = Plan::from_yaml("- SortRule: {sort_by: A}\n", "polars", &registry).unwrap_err();
    assert_eq!(err.code, "RG-DECL-001");
    assert_eq!(err.message, "Unknown backend 'polars'.");

    let err = Plan::from_yaml("- SortRule: {sort_by: A}\n- PivotRule: {}\n", BACKEND, &registry)
        .unwrap_err();
    assert_eq!(err.code, "RG-DECL-002");
    assert_eq!(err.context.get("rule_index").map(String::as_str), Some("1"));
    assert!(err.recovery_suggestions[0].contains("SortRule"));
}

#[test]
fn unknown_attributes_are_rejected() {
    let err = Plan::from_yaml(
        "- SortRule: {sort_by: A, order: desc}\n",
        BACKEND,
        &RuleRegistry::with_builtins(),
    )
    .unwrap_err();
    assert_eq!(err.code, "RG-DECL-004");
    assert_eq!(err.message, "SortRule does not accept attribute(s): order");
}

#[test]
fn mode_conflicts_surface_while_loading() {
    let err = Plan::from_yaml(
        "- SortRule: {sort_by: A, named_input: x, named_output: y}\n- SortRule: {sort_by: A}\n",
        BACKEND,
        &RuleRegistry::with_builtins(),
    )
    .unwrap_err();
    assert_eq!(err.code, "RG-PLAN-003");
    assert_eq!(err.context.get("rule_kind").map(String::as_str), Some("SortRule"));
}

#[test]
fn load_plan_reads_from_disk_and_tags_the_path() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("plan.yml");
    fs::write(&good, PLAN_YAML).unwrap();
    let registry = RuleRegistry::with_builtins();
    assert_eq!(load_plan(&good, BACKEND, &registry).unwrap().len(), 3);

    let bad = dir.path().join("bad.yml");
    fs::write(&bad, "- NopeRule: {}\n").unwrap();
    let err = load_plan(&bad, BACKEND, &registry).unwrap_err();
    assert_eq!(
        err.context.get("path").map(String::as_str),
        Some(bad.display().to_string().as_str())
    );

    let err = load_plan(&dir.path().join("missing.yml"), BACKEND, &registry).unwrap_err();
    assert_eq!(err.category, ErrorCategory::IoError);
    assert_eq!(err.code, "RG-DECL-006");
}

#[test]
fn same_rule_compares_kind_and_attributes() {
    let a = RoundRule::new("amount", 2);
    let b = RoundRule::new("amount", 2);
    let c = RoundRule::new("amount", 3);
    assert!(same_rule(&a, &b));
    assert!(!same_rule(&a, &c));

    let join = InnerJoinRule::new("l", "r", ["id"]);
    assert!(!same_rule(&a, &join));
}

#[test]
fn same_rule_ignores_excluded_attributes() {
    let here = ReadJsonFileRule::new("orders.jsonl", "/data/a");
    let there = ReadJsonFileRule::new("orders.jsonl", "/data/b");
    assert!(same_rule(&here, &there));
    assert!(!same_rule(&here, &ReadJsonFileRule::new("other.jsonl", "/data/a")));
}

#[test]
fn registry_lists_memory_kinds() {
    let registry = RuleRegistry::with_builtins();
    assert_eq!(registry.backends(), vec!["memory"]);
    assert!(registry.has_backend(BACKEND));
    assert_eq!(registry.kinds(BACKEND).len(), 12);
    assert!(registry.kinds(BACKEND).contains(&"TypeConversionRule"));
}

#[test]
fn custom_backends_register_through_the_builder() {
    let mut builder = RuleRegistry::builder();
    builder.register("custom", "TypeConversionRule", decode_rule::<TypeConversionRule>);
    let registry = builder.build();

    let plan = Plan::from_yaml(
        "- TypeConversionRule: {mapper: {A: int64}}\n",
        "custom",
        &registry,
    )
    .unwrap();
    assert_eq!(plan.len(), 1);
    assert!(!registry.has_backend(BACKEND));
}

#[test]
#[should_panic(expected = "duplicate rule registered: custom/SortRule")]
fn duplicate_registration_panics() {
    let mut builder = RuleRegistry::builder();
    builder.register("custom", "SortRule", decode_rule::<SortRule>);
    builder.register("custom", "SortRule", decode_rule::<SortRule>);
}
