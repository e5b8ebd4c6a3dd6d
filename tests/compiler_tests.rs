// tests/compiler_tests.rs

use std::collections::HashSet;

use mql_lang::{
    CompileOptions, CompiledQuery, Compiler, JsonTypeConverter, MqlError, NullOrder, Order,
    StaticSchema, Value, ValueType,
};
use rust_decimal::Decimal;
use serde_json::{Value as JsonValue, json};

fn schema() -> StaticSchema {
    StaticSchema::new()
        .with_entity(
            "Employee",
            [
                ("id", ValueType::Integer),
                ("name", ValueType::String),
                ("age", ValueType::Integer),
                ("salary", ValueType::Decimal),
                ("rating", ValueType::Float),
                ("active", ValueType::Boolean),
                ("grade", ValueType::Char),
                ("hiredAt", ValueType::String),
                ("manager", ValueType::Entity("Employee".into())),
                ("department", ValueType::Entity("Department".into())),
            ],
        )
        .with_entity(
            "Department",
            [
                ("id", ValueType::Integer),
                ("title", ValueType::String),
            ],
        )
        .with_entity(
            "Task",
            [
                ("id", ValueType::Integer),
                ("ownerId", ValueType::Integer),
                ("owner", ValueType::Entity("Employee".into())),
                ("done", ValueType::Boolean),
                ("title", ValueType::String),
            ],
        )
}

fn compile_with(options: CompileOptions, filter: JsonValue) -> Result<CompiledQuery, MqlError> {
    let schema = schema();
    let converter = JsonTypeConverter::new();
    let compiler = Compiler::new(&schema, &converter, options)?;
    compiler.compile(&filter)
}

fn compile(filter: JsonValue) -> Result<CompiledQuery, MqlError> {
    compile_with(CompileOptions::new("Employee").with_alias("e"), filter)
}

/// Text of the row statement.
fn rows(filter: JsonValue) -> String {
    compile(filter).unwrap().rows.text
}

fn params(query: &CompiledQuery) -> Vec<(String, Value)> {
    query
        .parameters
        .iter()
        .map(|(n, v)| (n.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_like_case_insensitive() {
    let query = compile_with(
        CompileOptions::new("Employee"),
        json!({"$alias": "e", "name": {"$like": "a%", "$caseSensitive": false}}),
    )
    .unwrap();

    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE LOWER(e.name) LIKE LOWER(:p1)"
    );
    assert_eq!(
        query.count.text,
        "SELECT COUNT(*) FROM Employee e WHERE LOWER(e.name) LIKE LOWER(:p1)"
    );
    assert_eq!(params(&query), vec![("p1".to_string(), Value::String("a%".into()))]);
}

#[test]
fn test_empty_filter_has_no_where() {
    let query = compile(json!({})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e");
    assert_eq!(query.count.text, "SELECT COUNT(*) FROM Employee e");
    assert!(query.parameters.is_empty());
}

#[test]
fn test_implicit_and() {
    assert_eq!(
        rows(json!({"age": 30, "name": "Bob"})),
        "SELECT e FROM Employee e WHERE (e.age = :p1) AND (e.name = :p2)"
    );
}

#[test]
fn test_qualified_and_relative_paths_match() {
    assert_eq!(rows(json!({"e.age": 30})), rows(json!({"age": 30})));
}

#[test]
fn test_relation_traversal() {
    assert_eq!(
        rows(json!({"department.title": "Ops", "manager.manager.name": "Ann"})),
        "SELECT e FROM Employee e WHERE (e.department.title = :p1) AND (e.manager.manager.name = :p2)"
    );
}

#[test]
fn test_comparison_symbols() {
    let cases = [
        ("$eq", "="),
        ("$ne", "<>"),
        ("$gt", ">"),
        ("$gte", ">="),
        ("$lt", "<"),
        ("$lte", "<="),
    ];

    for (key, symbol) in cases {
        let mut operand = serde_json::Map::new();
        operand.insert(key.to_string(), json!(5));
        assert_eq!(
            rows(json!({"age": operand})),
            format!("SELECT e FROM Employee e WHERE e.age {} :p1", symbol)
        );
    }
}

#[test]
fn test_eq_sugar_matches_explicit_eq() {
    let sugar = compile(json!({"age": 5})).unwrap();
    let explicit = compile(json!({"age": {"$eq": 5}})).unwrap();
    assert_eq!(sugar.rows.text, explicit.rows.text);
    assert_eq!(sugar.count.text, explicit.count.text);
    assert_eq!(sugar.parameters, explicit.parameters);
}

// ============================================================================
// $and / $or
// ============================================================================

#[test]
fn test_empty_and_or() {
    assert_eq!(rows(json!({"$and": []})), "SELECT e FROM Employee e");
    assert_eq!(rows(json!({"$or": []})), "SELECT e FROM Employee e");
}

#[test]
fn test_single_term_has_no_parentheses() {
    assert_eq!(
        rows(json!({"$or": [{"age": 5}]})),
        "SELECT e FROM Employee e WHERE e.age = :p1"
    );
}

#[test]
fn test_two_terms_are_parenthesized() {
    assert_eq!(
        rows(json!({"$or": [{"age": 5}, {"name": "Bob"}]})),
        "SELECT e FROM Employee e WHERE (e.age = :p1) OR (e.name = :p2)"
    );
    assert_eq!(
        rows(json!({"$and": [{"age": 5}, {"name": "Bob"}]})),
        "SELECT e FROM Employee e WHERE (e.age = :p1) AND (e.name = :p2)"
    );
}

#[test]
fn test_single_term_group_inside_join() {
    assert_eq!(
        rows(json!({"age": 1, "$or": [{"age": 5, "name": "Bob"}]})),
        "SELECT e FROM Employee e WHERE (e.age = :p1) AND ((e.age = :p2) AND (e.name = :p3))"
    );
}

#[test]
fn test_nested_groups() {
    assert_eq!(
        rows(json!({"$or": [{"age": 5, "name": "Bob"}, {"active": true}]})),
        "SELECT e FROM Employee e WHERE ((e.age = :p1) AND (e.name = :p2)) OR (e.active = :p3)"
    );
}

#[test]
fn test_or_next_to_other_terms() {
    assert_eq!(
        rows(json!({"active": true, "$or": [{"age": 5}, {"age": 6}]})),
        "SELECT e FROM Employee e WHERE (e.active = :p1) AND ((e.age = :p2) OR (e.age = :p3))"
    );
}

#[test]
fn test_empty_terms_are_skipped() {
    assert_eq!(
        rows(json!({"$and": [{}, {"age": 5}, {"$or": []}]})),
        "SELECT e FROM Employee e WHERE e.age = :p1"
    );
}

#[test]
fn test_comment_is_ignored() {
    assert_eq!(
        rows(json!({"$comment": "adults only", "age": {"$gte": 18}})),
        "SELECT e FROM Employee e WHERE e.age >= :p1"
    );
    assert_eq!(rows(json!({"$comment": "nothing"})), "SELECT e FROM Employee e");
}

// ============================================================================
// NULL handling
// ============================================================================

#[test]
fn test_eq_null() {
    let query = compile(json!({"manager": {"$eq": null}})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.manager IS NULL");
    assert!(query.parameters.is_empty());
}

#[test]
fn test_ne_null() {
    assert_eq!(
        rows(json!({"name": {"$ne": null}})),
        "SELECT e FROM Employee e WHERE e.name IS NOT NULL"
    );
}

#[test]
fn test_scalar_null() {
    assert_eq!(
        rows(json!({"name": null})),
        "SELECT e FROM Employee e WHERE e.name IS NULL"
    );
}

#[test]
fn test_is_null() {
    assert_eq!(
        rows(json!({"manager": {"$isNull": true}})),
        "SELECT e FROM Employee e WHERE e.manager IS NULL"
    );
    assert_eq!(
        rows(json!({"manager": {"$isNull": false}})),
        "SELECT e FROM Employee e WHERE e.manager IS NOT NULL"
    );
}

#[test]
fn test_ordering_against_null_is_error() {
    for key in ["$gt", "$gte", "$lt", "$lte"] {
        let mut operand = serde_json::Map::new();
        operand.insert(key.to_string(), JsonValue::Null);
        assert!(matches!(compile(json!({"age": operand})), Err(MqlError::Syntax(_))));
    }
}

// ============================================================================
// IN / LIKE / attribute operands
// ============================================================================

#[test]
fn test_in_binds_one_list() {
    let query = compile(json!({"id": {"$in": [1, "2", 3]}})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.id IN :p1");
    assert_eq!(
        query.parameters.get("p1"),
        Some(&Value::List(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]))
    );
}

#[test]
fn test_nin() {
    assert_eq!(
        rows(json!({"id": {"$nin": [4]}})),
        "SELECT e FROM Employee e WHERE e.id NOT IN :p1"
    );
}

#[test]
fn test_in_conversion_error() {
    let result = compile(json!({"id": {"$in": [1, "two"]}}));
    assert!(matches!(result, Err(MqlError::Conversion(_))));
}

#[test]
fn test_operand_shape_errors_come_before_conversion() {
    let cases = [
        json!({"age": {"$eq": [1, 2]}}),
        json!({"id": {"$in": []}}),
        json!({"id": {"$in": [1, null]}}),
        json!({"name": {"$eq": "x", "$escape": "!", "$caseSensitive": false}}),
    ];

    for filter in cases {
        assert!(
            matches!(compile(filter.clone()), Err(MqlError::Syntax(_))),
            "expected syntax error for {}",
            filter
        );
    }
}

#[test]
fn test_like_with_escape() {
    let query = compile(json!({"name": {"$nlike": "50!%", "$escape": "!"}})).unwrap();
    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE e.name NOT LIKE :p1 ESCAPE :p2"
    );
    assert_eq!(
        params(&query),
        vec![
            ("p1".to_string(), Value::String("50!%".into())),
            ("p2".to_string(), Value::Char('!')),
        ]
    );
}

#[test]
fn test_like_pattern_is_not_converted() {
    let query = compile(json!({"age": {"$like": "4%"}})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age LIKE :p1");
    assert_eq!(query.parameters.get("p1"), Some(&Value::String("4%".into())));
}

#[test]
fn test_attr_path_operand() {
    let query = compile(json!({"age": {"$gt": {"$attrPath": "manager.age"}}})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age > e.manager.age");
    assert!(query.parameters.is_empty());
}

#[test]
fn test_attr_path_term() {
    assert_eq!(
        rows(json!({"name": {"$attrPath": "e.manager.name"}})),
        "SELECT e FROM Employee e WHERE e.name = e.manager.name"
    );
}

#[test]
fn test_unknown_attr_path_operand() {
    let result = compile(json!({"age": {"$eq": {"$attrPath": "manager.nope"}}}));
    assert!(matches!(result, Err(MqlError::Syntax(_))));
}

// ============================================================================
// Type conversion
// ============================================================================

#[test]
fn test_literals_are_converted() {
    let query = compile(json!({
        "age": "42",
        "salary": {"$gte": "1000.50"},
        "rating": {"$lt": 4},
        "active": "true",
        "grade": "A"
    }))
    .unwrap();

    assert_eq!(
        params(&query),
        vec![
            ("p1".to_string(), Value::Integer(42)),
            ("p2".to_string(), Value::Decimal(Decimal::new(100050, 2))),
            ("p3".to_string(), Value::Float(4.0)),
            ("p4".to_string(), Value::Boolean(true)),
            ("p5".to_string(), Value::Char('A')),
        ]
    );
}

#[test]
fn test_conversion_errors() {
    let cases = [
        json!({"age": "abc"}),
        json!({"age": 1.5}),
        json!({"active": 1}),
        json!({"grade": "AB"}),
        json!({"manager": 5}),
        json!({"name": [1]}),
    ];

    for filter in cases {
        assert!(
            matches!(compile(filter.clone()), Err(MqlError::Conversion(_))),
            "expected conversion error for {}",
            filter
        );
    }
}

// ============================================================================
// Subqueries
// ============================================================================

#[test]
fn test_exists() {
    let query = compile(json!({
        "$sqlExists": {
            "$entityName": "Task",
            "$alias": "t",
            "$query": {"t.ownerId": {"$attrPath": "e.id"}, "done": false}
        }
    }))
    .unwrap();

    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE EXISTS (SELECT t FROM Task t WHERE (t.ownerId = e.id) AND (t.done = :p1))"
    );
    assert_eq!(query.parameters.get("p1"), Some(&Value::Boolean(false)));
}

#[test]
fn test_not_exists_without_condition() {
    assert_eq!(
        rows(json!({"$nSqlExists": {"$entityName": "Task", "$alias": "t", "$query": {}}})),
        "SELECT e FROM Employee e WHERE NOT EXISTS (SELECT t FROM Task t)"
    );
}

#[test]
fn test_inner_queries_bind_first() {
    assert_eq!(
        rows(json!({
            "age": 30,
            "$sqlExists": {"$entityName": "Task", "$alias": "t", "$query": {"done": true}}
        })),
        "SELECT e FROM Employee e WHERE (e.age = :p2) AND (EXISTS (SELECT t FROM Task t WHERE t.done = :p1))"
    );
}

#[test]
fn test_nested_not_exists_sees_outer_aliases() {
    let query = compile(json!({
        "$sqlExists": {
            "$entityName": "Task",
            "$alias": "t",
            "$query": {
                "t.ownerId": {"$attrPath": "e.id"},
                "$nSqlExists": {
                    "$entityName": "Employee",
                    "$alias": "m",
                    "$query": {"m.id": {"$attrPath": "t.ownerId"}, "e.active": false}
                }
            }
        }
    }))
    .unwrap();

    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE EXISTS (SELECT t FROM Task t WHERE (t.ownerId = e.id) AND \
         (NOT EXISTS (SELECT m FROM Employee m WHERE (m.id = t.ownerId) AND (e.active = :p1))))"
    );
}

#[test]
fn test_duplicate_alias_in_nested_scope() {
    let result = compile(json!({
        "$sqlExists": {
            "$entityName": "Task",
            "$alias": "t",
            "$query": {
                "$nSqlExists": {"$entityName": "Employee", "$alias": "e", "$query": {}}
            }
        }
    }));
    assert!(matches!(result, Err(MqlError::Syntax(_))));
}

#[test]
fn test_sibling_subqueries_may_share_alias() {
    let task = |done: bool| {
        json!({"$sqlExists": {"$entityName": "Task", "$alias": "t", "$query": {"done": done}}})
    };
    let query = compile(json!({"$or": [task(true), task(false)]})).unwrap();
    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE (EXISTS (SELECT t FROM Task t WHERE t.done = :p1)) \
         OR (EXISTS (SELECT t FROM Task t WHERE t.done = :p2))"
    );
}

#[test]
fn test_outer_query_cannot_see_inner_alias() {
    let result = compile(json!({
        "t.done": true,
        "$sqlExists": {"$entityName": "Task", "$alias": "t", "$query": {}}
    }));
    assert!(matches!(result, Err(MqlError::Syntax(_))));
}

#[test]
fn test_unknown_subquery_entity() {
    let result = compile(json!({"$sqlExists": {"$entityName": "Nope", "$alias": "n", "$query": {}}}));
    assert!(matches!(result, Err(MqlError::Syntax(_))));
}

// ============================================================================
// Order and paging
// ============================================================================

#[test]
fn test_order_by() {
    let options = CompileOptions::new("Employee")
        .with_alias("e")
        .with_order("hiredAt desc nulls last".parse().unwrap())
        .with_order(Order::asc("name".parse().unwrap()))
        .with_order(Order::asc("e.age".parse().unwrap()).nulls(NullOrder::First));
    let query = compile_with(options, json!({"active": true})).unwrap();

    assert_eq!(
        query.rows.text,
        "SELECT e FROM Employee e WHERE e.active = :p1 ORDER BY \
         (CASE WHEN e.hiredAt IS NULL THEN 0 ELSE 1 END) DESC, e.hiredAt DESC, \
         e.name ASC, \
         (CASE WHEN e.age IS NULL THEN 0 ELSE 1 END) ASC, e.age ASC"
    );
    assert_eq!(query.count.text, "SELECT COUNT(*) FROM Employee e WHERE e.active = :p1");
}

#[test]
fn test_order_by_unknown_attribute() {
    let options = CompileOptions::new("Employee")
        .with_alias("e")
        .with_order(Order::desc("nope".parse().unwrap()));
    assert!(matches!(compile_with(options, json!({})), Err(MqlError::Syntax(_))));
}

#[test]
fn test_paging_applies_to_rows_only() {
    let options = CompileOptions::new("Employee")
        .with_alias("e")
        .with_max_rows(20)
        .with_first_row(40);
    let query = compile_with(options, json!({})).unwrap();

    assert_eq!(query.rows.max_rows, Some(20));
    assert_eq!(query.rows.first_row, 40);
    assert_eq!(query.count.max_rows, None);
    assert_eq!(query.count.first_row, 0);
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_placeholders_are_unique() {
    let query = compile(json!({
        "age": {"$gte": 18},
        "name": {"$like": "A%"},
        "$or": [{"id": 1}, {"id": 2}, {"active": true}]
    }))
    .unwrap();

    let names: Vec<&str> = query.parameters.names().collect();
    assert_eq!(names.len(), 5);
    assert_eq!(names.iter().collect::<HashSet<_>>().len(), 5);
    for name in names {
        let placeholder = format!(":{}", name);
        assert!(query.rows.text.contains(&placeholder));
        assert!(query.count.text.contains(&placeholder));
    }
}

#[test]
fn test_compile_is_deterministic() {
    let filter = json!({
        "age": {"$in": [1, 2]},
        "$or": [{"name": {"$like": "a%", "$escape": "\\"}}, {"manager.name": null}],
        "$sqlExists": {"$entityName": "Task", "$alias": "t", "$query": {"done": true}}
    });
    let first = compile(filter.clone()).unwrap();
    let second = compile(filter).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Root settings and configuration
// ============================================================================

#[test]
fn test_entity_and_alias_from_filter() {
    let query = compile_with(
        CompileOptions::default(),
        json!({"$entityName": "Department", "$alias": "d", "title": "Ops"}),
    )
    .unwrap();
    assert_eq!(query.rows.text, "SELECT d FROM Department d WHERE d.title = :p1");
}

#[test]
fn test_query_key() {
    assert_eq!(
        rows(json!({"$query": {"age": 3}})),
        "SELECT e FROM Employee e WHERE e.age = :p1"
    );
}

#[test]
fn test_configuration_errors() {
    let no_alias = compile_with(CompileOptions::new("Employee"), json!({"age": 1}));
    assert!(matches!(no_alias, Err(MqlError::Configuration(_))));

    let no_entity = compile_with(CompileOptions::default().with_alias("e"), json!({}));
    assert!(matches!(no_entity, Err(MqlError::Configuration(_))));

    let conflict = compile(json!({"$entityName": "Task"}));
    assert!(matches!(conflict, Err(MqlError::Configuration(_))));

    let no_filter = compile(JsonValue::Null);
    assert!(matches!(no_filter, Err(MqlError::Configuration(_))));
}

#[test]
fn test_compiler_validates_options() {
    let schema = schema();
    let converter = JsonTypeConverter::new();

    let blank = Compiler::new(&schema, &converter, CompileOptions::new("  "));
    assert!(matches!(blank, Err(MqlError::Configuration(_))));

    let bad_alias = Compiler::new(&schema, &converter, CompileOptions::new("Employee").with_alias("1e"));
    assert!(matches!(bad_alias, Err(MqlError::Configuration(_))));
}

#[test]
fn test_unknown_entity_and_attribute() {
    let unknown_entity = compile_with(CompileOptions::new("Nope").with_alias("n"), json!({}));
    assert!(matches!(unknown_entity, Err(MqlError::Syntax(_))));

    assert!(matches!(compile(json!({"nope": 1})), Err(MqlError::Syntax(_))));
    assert!(matches!(compile(json!({"name.length": 1})), Err(MqlError::Syntax(_))));
    assert!(matches!(compile(json!({"e": 1})), Err(MqlError::Syntax(_))));
}

#[test]
fn test_regex_is_rejected() {
    assert!(matches!(compile(json!({"name": {"$regex": "^A"}})), Err(MqlError::Syntax(_))));
}

#[test]
fn test_lenient_operand_priority() {
    let options = CompileOptions::new("Employee").with_alias("e").lenient();
    let query = compile_with(options, json!({"age": {"$gt": 1, "$lte": 9}})).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age <= :p1");
    assert_eq!(query.parameters.get("p1"), Some(&Value::Integer(9)));
}

#[test]
fn test_compile_str() {
    let schema = schema();
    let converter = JsonTypeConverter::new();
    let compiler = Compiler::new(&schema, &converter, CompileOptions::new("Employee").with_alias("e")).unwrap();

    let query = compiler.compile_str(r#"{"age": 3}"#).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age = :p1");
    assert!(matches!(compiler.compile_str("{"), Err(MqlError::Syntax(_))));
}

#[test]
fn test_deeply_nested_filter_compiles() {
    let mut filter = json!({"age": 1});
    for _ in 0..1_000 {
        filter = json!({"$and": [filter]});
    }
    assert_eq!(rows(filter), "SELECT e FROM Employee e WHERE e.age = :p1");
}

#[test]
fn test_deeply_nested_filter_text_compiles() {
    let depth = 500;
    let text = format!(
        "{}{}{}",
        r#"{"$and": ["#.repeat(depth),
        r#"{"age": 1}"#,
        "]}".repeat(depth)
    );

    let schema = schema();
    let converter = JsonTypeConverter::new();
    let compiler = Compiler::new(&schema, &converter, CompileOptions::new("Employee").with_alias("e")).unwrap();
    let query = compiler.compile_str(&text).unwrap();
    assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age = :p1");
}
