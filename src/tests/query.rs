use std::collections::HashMap;

use serde_json::json;

use crate::{
    build_query, CollectSink, CompareOp, Comparison, ConditionBuilder, Diagnostic, Expr,
    FieldKind, IgnoreSink, Operand, ParsedQuery, PassThrough, QueryParams, QueryParser, Record,
    SchemaField, TypeTableCache, DEFAULT_GROUP,
};

struct User;

impl Record for User {
    fn fields() -> Vec<SchemaField> {
        vec![
            SchemaField::new("ID", FieldKind::U64),
            SchemaField::new("Name", FieldKind::String),
            SchemaField::new("Age", FieldKind::I32),
            SchemaField::new("Score", FieldKind::F64),
        ]
    }
}

fn parse(query: &str) -> ParsedQuery {
    let cache = TypeTableCache::new();
    QueryParser::with_cache::<User>(&cache)
        .with_sink(&IgnoreSink)
        .parse_query_string(query)
}

fn render(query: &str) -> String {
    parse(query).condition.to_string()
}

fn only_comparison(query: &str) -> Comparison {
    match parse(query).condition.items() {
        [Expr::Compare(cmp)] => cmp.clone(),
        other => panic!("expected a single comparison for {query}, got {other:?}"),
    }
}

// --- Grouping ---

#[test]
fn test_default_group_without_gcond() {
    let parsed = parse("q=name=bob&q=age>=30");
    assert_eq!(parsed.condition.to_string(), r#"name = "bob" AND age >= 30"#);
    assert_eq!(parsed.groups.len(), 1);
    assert_eq!(parsed.groups[DEFAULT_GROUP], parsed.condition);
}

#[test]
fn test_named_group_without_gcond() {
    let parsed = parse("q=a.name=bob");
    assert!(parsed.condition.is_empty());
    assert_eq!(parsed.groups["a"].to_string(), r#"name = "bob""#);
}

#[test]
fn test_no_filters() {
    let parsed = parse("page=1");
    assert_eq!(
        parsed,
        ParsedQuery {
            options: PassThrough {
                page: Some("1".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    );
}

// --- Values ---

#[test]
fn test_null_sentinel() {
    assert_eq!(render("q=name=null"), "name IS NULL");
    assert_eq!(render("q=name=NULL"), "name IS NULL");
    assert_eq!(render("q=name!=null"), "name IS NOT NULL");
}

#[test]
fn test_integer_columns_are_coerced() {
    assert_eq!(only_comparison("q=age>=30").value, Operand::Single(json!(30)));
    assert_eq!(only_comparison("q=id=7").value, Operand::Single(json!(7)));
    assert_eq!(only_comparison("q=name>=30").value, Operand::Single(json!("30")));
    assert_eq!(only_comparison("q=score>=1").value, Operand::Single(json!("1")));
    assert_eq!(only_comparison("q=age>=old").value, Operand::Single(json!("old")));
}

#[test]
fn test_membership_and_range() {
    let cmp = only_comparison("q=id?=1,2,3");
    assert_eq!(cmp.op, CompareOp::In);
    assert_eq!(cmp.value, Operand::List(vec![json!(1), json!(2), json!(3)]));

    let cmp = only_comparison("q=age^=18,65");
    assert_eq!(cmp.op, CompareOp::Between);
    assert_eq!(cmp.value, Operand::Range(json!(18), json!(65)));

    let parsed = parse("q=age^=18");
    assert!(parsed.condition.is_empty());
    assert!(parsed.groups[DEFAULT_GROUP].is_empty());
}

#[test]
fn test_operator_precedence_end_to_end() {
    assert_eq!(only_comparison("q=name!~<=bo").op, CompareOp::NotLikeLeft);
    assert_eq!(only_comparison("q=name~<=bo").op, CompareOp::LikeLeft);
    assert_eq!(only_comparison("q=name!~>=bo").op, CompareOp::NotLikeRight);
    assert_eq!(only_comparison("q=id!?=1").op, CompareOp::NotIn);
    assert_eq!(only_comparison("q=age!^=1,2").op, CompareOp::NotBetween);
}

// --- Composition ---

const TWO_GROUPS: &str = "q=a.name=bob&q=b.age>30&q=c.id?=1,2";

#[test]
fn test_gcond_or() {
    assert_eq!(
        render(&format!("{TWO_GROUPS}&gcond=a|b")),
        r#"name = "bob" OR age > 30"#
    );
}

#[test]
fn test_gcond_and() {
    assert_eq!(
        render(&format!("{TWO_GROUPS}&gcond=a*b")),
        r#"name = "bob" AND age > 30"#
    );
}

#[test]
fn test_gcond_nested() {
    assert_eq!(
        render(&format!("{TWO_GROUPS}&gcond=a*(b|c)")),
        r#"name = "bob" AND (age > 30 OR id IN [1, 2])"#
    );
}

#[test]
fn test_gcond_single_reference_is_empty() {
    let parsed = parse(&format!("{TWO_GROUPS}&gcond=a"));
    assert!(parsed.condition.is_empty());
    assert_eq!(parsed.groups.len(), 3);
}

#[test]
fn test_gcond_unknown_group() {
    let parsed = parse(&format!("{TWO_GROUPS}&gcond=a|z"));
    assert_eq!(parsed.condition, parsed.groups["a"]);
}

#[test]
fn test_gcond_first_value_wins() {
    assert_eq!(
        render(&format!("{TWO_GROUPS}&gcond=a*b&gcond=a|b")),
        r#"name = "bob" AND age > 30"#
    );
}

#[test]
fn test_empty_gcond_falls_back_to_default() {
    assert_eq!(render("q=name=bob&q=a.age=1&gcond="), r#"name = "bob""#);
}

#[test]
fn test_encoded_query_string() {
    assert_eq!(
        render("q=a.age%3E%3D30&q=b.name%3Dbob%20smith&gcond=a%7Cb"),
        r#"age >= 30 OR name = "bob smith""#
    );
}

// --- Pass-through ---

#[test]
fn test_pass_through_options() {
    let parsed = parse("page=1&page=3&size=20&isTotal=true&sort=age&select=id&omit=name&other=x");
    assert_eq!(
        parsed.options,
        PassThrough {
            page: Some("3".into()),
            size: Some("20".into()),
            is_total: Some("true".into()),
            sort: Some("age".into()),
            select: Some("id".into()),
            omit: Some("name".into()),
        }
    );
}

// --- Diagnostics ---

#[test]
fn test_ignored_filters_are_reported() {
    let cache = TypeTableCache::new();
    let sink = CollectSink::new();
    let parsed = QueryParser::with_cache::<User>(&cache)
        .with_sink(&sink)
        .parse_query_string("q=broken&q=a.b.c=1&q=a.age=old&q=b.age^=1&gcond=a|z");

    assert_eq!(parsed.condition.to_string(), r#"age = "old""#);
    assert_eq!(
        sink.into_inner(),
        vec![
            Diagnostic::NoOperator {
                raw: "broken".into()
            },
            Diagnostic::NestedGroup {
                raw: "a.b.c=1".into()
            },
            Diagnostic::NotAnInteger {
                column: "age".into(),
                raw_value: "old".into(),
            },
            Diagnostic::MalformedRange {
                column: "age".into(),
                raw_value: "1".into(),
            },
            Diagnostic::UnknownGroup {
                group: "z".into(),
                position: 2,
            },
        ]
    );
}

// --- Entry points ---

#[test]
fn test_parse_is_repeatable() {
    let cache = TypeTableCache::new();
    let parser = QueryParser::with_cache::<User>(&cache).with_sink(&IgnoreSink);
    let query = format!("{TWO_GROUPS}&q=name~=x&gcond=(a|b)*c&page=2");

    assert_eq!(parser.parse_query_string(&query), parser.parse_query_string(&query));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_build_query_with_hash_map() {
    let mut map = HashMap::new();
    map.insert("q".to_string(), vec!["age<5".to_string(), "x.id=1".to_string()]);
    map.insert("gcond".to_string(), vec!["x".to_string()]);

    let parsed = build_query::<User>(&QueryParams::from(map));
    assert!(parsed.condition.is_empty());
    assert_eq!(parsed.groups[DEFAULT_GROUP].to_string(), "age < 5");
    assert_eq!(parsed.groups["x"].to_string(), "id = 1");
}

#[test]
fn test_parsed_query_serializes() {
    let parsed = parse("q=age>1&size=5");
    assert_eq!(
        serde_json::to_value(&parsed).unwrap(),
        json!({
            "condition": [{"kind": "compare", "column": "age", "op": "gt", "value": 1}],
            "groups": {
                "default": [{"kind": "compare", "column": "age", "op": "gt", "value": 1}]
            },
            "options": {"size": "5"}
        })
    );
}
