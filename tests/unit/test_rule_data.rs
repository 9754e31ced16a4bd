use indexmap::IndexMap;
use rulegraph::core::table::TableError;
use rulegraph::core::{ErrorCategory, RuleData, Table};
use serde_json::{json, Value};

fn table(records: &[Value]) -> Table {
    Table::from_records(records).unwrap()
}

#[test]
fn main_slot_starts_from_the_supplied_input() {
    let input = table(&[json!({"A": 1})]);
    let mut data = RuleData::with_main(input.clone());
    assert!(data.has_main_output());
    assert_eq!(data.get_main_output().unwrap(), &input);

    let replaced = table(&[json!({"B": 2})]);
    data.set_main_output(replaced.clone());
    assert_eq!(data.get_main_output().unwrap(), &replaced);
}

#[test]
fn missing_slots_are_typed_errors() {
    let data = RuleData::with_named_inputs([("orders", Table::default())]);

    let err = data.get_main_output().unwrap_err();
    assert_eq!(err.category, ErrorCategory::MissingMainOutput);
    assert_eq!(err.code, "RG-DATA-001");

    let err = data.get_named_output("customers").unwrap_err();
    assert_eq!(err.category, ErrorCategory::MissingNamedOutput);
    assert_eq!(err.code, "RG-DATA-002");
    assert_eq!(err.message, "No such named output 'customers'.");
    assert_eq!(err.recovery_suggestions, vec!["available names: orders".to_string()]);
}

#[test]
fn named_outputs_are_created_and_overwritten() {
    let mut data = RuleData::default();
    assert!(!data.has_named_output("x"));

    data.set_named_output("x", table(&[json!({"A": 1})]));
    data.set_named_output("y", Table::default());
    data.set_named_output("x", table(&[json!({"A": 2})]));

    assert_eq!(data.get_named_output("x").unwrap().rows()[0], vec![json!(2)]);
    let names: Vec<&str> = data.named_output_names().collect();
    assert_eq!(names, vec!["x", "y"]);
    assert!(data.external_inputs().is_empty());
}

#[test]
fn external_inputs_follow_construction_order() {
    let mut named = IndexMap::new();
    named.insert("b".to_string(), Table::default());
    named.insert("a".to_string(), Table::default());
    let data = RuleData::new(None, named);

    let external: Vec<&str> = data.external_inputs().iter().map(String::as_str).collect();
    assert_eq!(external, vec!["b", "a"]);
}

#[test]
fn into_parts_returns_every_slot() {
    let mut data = RuleData::with_main(table(&[json!({"A": 1})]));
    data.set_named_output("out", Table::default());
    let (main, named) = data.into_parts();
    assert!(main.is_some());
    assert_eq!(named.keys().collect::<Vec<_>>(), vec!["out"]);
}

#[test]
fn records_fix_columns_in_first_seen_order() {
    let t = table(&[json!({"b": 1, "a": 2}), json!({"c": 3, "a": 4})]);
    assert_eq!(t.columns(), &["b", "a", "c"].map(String::from));
    assert_eq!(t.rows()[1], vec![Value::Null, json!(4), json!(3)]);
    assert_eq!(t.to_records()[0], json!({"b": 1, "a": 2, "c": null}));
}

#[test]
fn tables_reject_malformed_shapes() {
    assert_eq!(
        Table::new(["A", "A"]).unwrap_err(),
        TableError::DuplicateColumn("A".to_string())
    );
    assert_eq!(
        Table::from_rows(["A", "B"], vec![vec![json!(1)]]).unwrap_err(),
        TableError::RowWidth {
            row: 0,
            expected: 2,
            found: 1
        }
    );
    assert_eq!(
        Table::from_records(&[json!({"A": 1}), json!([1, 2])]).unwrap_err(),
        TableError::NotAnObject(1)
    );
}

#[test]
fn table_sort_places_nulls_last_in_both_directions() {
    let t = table(&[json!({"A": 2}), json!({"A": null}), json!({"A": 1})]);
    let idx = t.column_index("A").unwrap();

    let asc = t.sorted_by(&[idx], true);
    assert_eq!(
        asc.column_values("A").unwrap(),
        vec![&json!(1), &json!(2), &Value::Null]
    );
    let desc = t.sorted_by(&[idx], false);
    assert_eq!(
        desc.column_values("A").unwrap(),
        vec![&json!(2), &json!(1), &Value::Null]
    );
}

#[test]
fn concat_aligns_columns_by_name() {
    let left = table(&[json!({"A": 1, "B": 2})]);
    let right = table(&[json!({"B": 3, "C": 4})]);
    let joined = left.concat(&right);
    assert_eq!(joined.columns(), &["A", "B", "C"].map(String::from));
    assert_eq!(
        joined.rows(),
        &[
            vec![json!(1), json!(2), Value::Null],
            vec![Value::Null, json!(3), json!(4)]
        ]
    );
}
