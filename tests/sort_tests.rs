// tests/sort_tests.rs

use mql_lang::{AttributePath, MqlError, NullOrder, Order, ParameterTable, Value};

fn path(text: &str) -> AttributePath {
    AttributePath::parse(text).unwrap()
}

// ============================================================================
// Order terms
// ============================================================================

#[test]
fn test_parse_path_only() {
    let order: Order = "name".parse().unwrap();
    assert_eq!(order, Order::asc(path("name")));
}

#[test]
fn test_parse_direction_and_nulls() {
    let order: Order = "e.hiredAt DESC Nulls First".parse().unwrap();
    assert_eq!(order.path, path("e.hiredAt"));
    assert!(order.descending);
    assert_eq!(order.null_order, NullOrder::First);

    let order: Order = "age nulls last".parse().unwrap();
    assert!(!order.descending);
    assert_eq!(order.null_order, NullOrder::Last);
}

#[test]
fn test_parse_rejects_malformed_terms() {
    for text in ["", "a..b", "name sideways", "name asc nulls", "name nulls middle", "a asc desc"] {
        let result = text.parse::<Order>();
        assert!(
            matches!(result, Err(MqlError::Configuration(_))),
            "expected configuration error for {:?}",
            text
        );
    }
}

#[test]
fn test_render() {
    let qualified = path("e.age");

    assert_eq!(Order::asc(path("age")).render(&qualified), "e.age ASC");
    assert_eq!(Order::desc(path("age")).render(&qualified), "e.age DESC");
    assert_eq!(
        Order::asc(path("age")).nulls(NullOrder::First).render(&qualified),
        "(CASE WHEN e.age IS NULL THEN 0 ELSE 1 END) ASC, e.age ASC"
    );
    assert_eq!(
        Order::desc(path("age")).nulls(NullOrder::Last).render(&qualified),
        "(CASE WHEN e.age IS NULL THEN 0 ELSE 1 END) DESC, e.age DESC"
    );
}

#[test]
fn test_display_uses_own_path() {
    assert_eq!(Order::desc(path("e.name")).to_string(), "e.name DESC");
}

// ============================================================================
// Parameter table
// ============================================================================

#[test]
fn test_issue_generates_sequential_names() {
    let mut params = ParameterTable::new();
    assert!(params.is_empty());

    let names: Vec<String> = (0..3).map(|i| params.issue(Value::Integer(i))).collect();
    assert_eq!(names, vec!["p1", "p2", "p3"]);
    assert_eq!(params.len(), 3);
}

#[test]
fn test_equal_values_get_distinct_names() {
    let mut params = ParameterTable::new();
    let a = params.issue(Value::String("x".into()));
    let b = params.issue(Value::String("x".into()));
    assert_ne!(a, b);
    assert_eq!(params.get(&a), params.get(&b));
}

#[test]
fn test_iteration_follows_issue_order() {
    let mut params = ParameterTable::new();
    params.issue(Value::Boolean(true));
    params.issue(Value::Null);

    let entries: Vec<(&str, &Value)> = params.iter().collect();
    assert_eq!(entries, vec![("p1", &Value::Boolean(true)), ("p2", &Value::Null)]);
    assert_eq!(params.get("p3"), None);

    let owned: Vec<(String, Value)> = params.into_iter().collect();
    assert_eq!(owned[1], ("p2".to_string(), Value::Null));
}
