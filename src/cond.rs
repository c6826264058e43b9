//! Condition accumulator.
//!
//! `ConditionBuilder` is the seam to whatever executes the query: it collects
//! comparison nodes for one scope and knows how to join scopes with AND/OR.
//! `QueryCond` is the bundled implementation, a flat list of nodes and
//! connectives in the order they were attached.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    LikeLeft,
    LikeRight,
    NotLike,
    NotLikeLeft,
    NotLikeRight,
    In,
    NotIn,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Like | CompareOp::LikeLeft | CompareOp::LikeRight => "LIKE",
            CompareOp::NotLike | CompareOp::NotLikeLeft | CompareOp::NotLikeRight => "NOT LIKE",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::Between => "BETWEEN",
            CompareOp::NotBetween => "NOT BETWEEN",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }

    /// Wildcard placement for the LIKE family: (leading `%`, trailing `%`).
    fn wildcards(&self) -> Option<(bool, bool)> {
        match self {
            CompareOp::Like | CompareOp::NotLike => Some((true, true)),
            CompareOp::LikeLeft | CompareOp::NotLikeLeft => Some((true, false)),
            CompareOp::LikeRight | CompareOp::NotLikeRight => Some((false, true)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    None,
    Single(Value),
    List(Vec<Value>),
    Range(Value, Value),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub column: String,
    pub op: CompareOp,
    #[serde(skip_serializing_if = "Operand::is_none")]
    pub value: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Compare(Comparison),
    Group { items: Vec<Expr> },
    And,
    Or,
}

impl Expr {
    fn is_node(&self) -> bool {
        matches!(self, Expr::Compare(_) | Expr::Group { .. })
    }

    fn connective(&self) -> Option<Connective> {
        match self {
            Expr::And => Some(Connective::And),
            Expr::Or => Some(Connective::Or),
            _ => None,
        }
    }
}

impl From<Connective> for Expr {
    fn from(c: Connective) -> Self {
        match c {
            Connective::And => Expr::And,
            Connective::Or => Expr::Or,
        }
    }
}

/// Accumulates comparison nodes for one scope.
///
/// Only `compare`, `connect`, `absorb`, `nest` and `is_empty` are required;
/// the named comparisons and the closure-style scoping helpers are built on
/// top of them.
pub trait ConditionBuilder: Default {
    fn compare(&mut self, column: &str, op: CompareOp, value: Operand);

    /// Joins the previous node and the next one with `connective`.
    fn connect(&mut self, connective: Connective);

    /// Appends every node and connective of `other`, flat.
    fn absorb(&mut self, other: &Self);

    /// Attaches `nested` as a single parenthesised node.
    fn nest(&mut self, connective: Connective, nested: Self);

    fn is_empty(&self) -> bool;

    fn equal(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Eq, Operand::Single(value));
    }

    fn not_equal(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Ne, Operand::Single(value));
    }

    fn gt(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Gt, Operand::Single(value));
    }

    fn ge(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Ge, Operand::Single(value));
    }

    fn lt(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Lt, Operand::Single(value));
    }

    fn le(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Le, Operand::Single(value));
    }

    fn like(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::Like, Operand::Single(value));
    }

    fn like_left(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::LikeLeft, Operand::Single(value));
    }

    fn like_right(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::LikeRight, Operand::Single(value));
    }

    fn not_like(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::NotLike, Operand::Single(value));
    }

    fn not_like_left(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::NotLikeLeft, Operand::Single(value));
    }

    fn not_like_right(&mut self, column: &str, value: Value) {
        self.compare(column, CompareOp::NotLikeRight, Operand::Single(value));
    }

    fn in_list(&mut self, column: &str, values: Vec<Value>) {
        self.compare(column, CompareOp::In, Operand::List(values));
    }

    fn not_in(&mut self, column: &str, values: Vec<Value>) {
        self.compare(column, CompareOp::NotIn, Operand::List(values));
    }

    fn between(&mut self, column: &str, low: Value, high: Value) {
        self.compare(column, CompareOp::Between, Operand::Range(low, high));
    }

    fn not_between(&mut self, column: &str, low: Value, high: Value) {
        self.compare(column, CompareOp::NotBetween, Operand::Range(low, high));
    }

    fn is_null(&mut self, column: &str) {
        self.compare(column, CompareOp::IsNull, Operand::None);
    }

    fn is_not_null(&mut self, column: &str) {
        self.compare(column, CompareOp::IsNotNull, Operand::None);
    }

    fn and(&mut self) {
        self.connect(Connective::And);
    }

    fn or(&mut self) {
        self.connect(Connective::Or);
    }

    fn and_with<F: FnOnce(&mut Self)>(&mut self, f: F) {
        let mut nested = Self::default();
        f(&mut nested);
        self.nest(Connective::And, nested);
    }

    fn or_with<F: FnOnce(&mut Self)>(&mut self, f: F) {
        let mut nested = Self::default();
        f(&mut nested);
        self.nest(Connective::Or, nested);
    }
}

/// Flat condition list: nodes separated by explicit connectives.
///
/// Never starts or ends with a connective, and never holds two in a row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryCond {
    items: Vec<Expr>,
}

impl QueryCond {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Expr] {
        &self.items
    }

    /// Most recently attached item.
    pub fn last(&self) -> Option<&Expr> {
        self.items.last()
    }

    /// Number of comparison nodes, nested groups included.
    pub fn comparison_count(&self) -> usize {
        count_comparisons(&self.items)
    }

    fn push_node(&mut self, node: Expr) {
        if self.last().is_some_and(Expr::is_node) {
            self.items.push(Expr::And);
        }
        self.items.push(node);
    }
}

fn count_comparisons(items: &[Expr]) -> usize {
    items
        .iter()
        .map(|item| match item {
            Expr::Compare(_) => 1,
            Expr::Group { items } => count_comparisons(items),
            Expr::And | Expr::Or => 0,
        })
        .sum()
}

impl ConditionBuilder for QueryCond {
    fn compare(&mut self, column: &str, op: CompareOp, value: Operand) {
        self.push_node(Expr::Compare(Comparison {
            column: column.to_string(),
            op,
            value,
        }));
    }

    fn connect(&mut self, connective: Connective) {
        match self.items.last_mut() {
            None => {}
            Some(last) if !last.is_node() => *last = connective.into(),
            Some(_) => self.items.push(connective.into()),
        }
    }

    fn absorb(&mut self, other: &Self) {
        for item in &other.items {
            match item.connective() {
                Some(connective) => self.connect(connective),
                None => self.push_node(item.clone()),
            }
        }
    }

    fn nest(&mut self, connective: Connective, nested: Self) {
        if nested.is_empty() {
            return;
        }
        self.connect(connective);
        self.push_node(Expr::Group {
            items: nested.items,
        });
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for QueryCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_items(f, &self.items)
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, " ")?;
        }
        match item {
            Expr::Compare(cmp) => write!(f, "{cmp}")?,
            Expr::Group { items } => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")?;
            }
            Expr::And => write!(f, "AND")?,
            Expr::Or => write!(f, "OR")?,
        }
    }
    Ok(())
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.op.keyword();
        match &self.value {
            Operand::None => write!(f, "{} {keyword}", self.column),
            Operand::Single(value) => match self.op.wildcards() {
                Some((leading, trailing)) => {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let pattern = format!(
                        "{}{text}{}",
                        if leading { "%" } else { "" },
                        if trailing { "%" } else { "" }
                    );
                    write!(f, "{} {keyword} {}", self.column, Value::String(pattern))
                }
                None => write!(f, "{} {keyword} {value}", self.column),
            },
            Operand::List(values) => {
                let list = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} {keyword} [{list}]", self.column)
            }
            Operand::Range(low, high) => {
                write!(f, "{} {keyword} {low} AND {high}", self.column)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_implicit_and_between_nodes() {
        let mut cond = QueryCond::new();
        cond.equal("name", json!("bob"));
        cond.ge("age", json!(30));

        assert_eq!(cond.to_string(), r#"name = "bob" AND age >= 30"#);
        assert_eq!(cond.items().len(), 3);
        assert_eq!(cond.comparison_count(), 2);
    }

    #[test]
    fn test_equality_on_concrete_cond() {
        let mut cond = QueryCond::new();
        cond.equal("name", json!("bob"));
        cond.or();
        cond.not_equal("age", json!(30));

        assert_eq!(cond.to_string(), r#"name = "bob" OR age <> 30"#);
        assert_eq!(
            cond.items()[2],
            Expr::Compare(Comparison {
                column: "age".into(),
                op: CompareOp::Ne,
                value: Operand::Single(json!(30)),
            })
        );

        let mut other = QueryCond::new();
        other.equal("name", json!("bob"));
        assert_ne!(cond, other);
    }

    #[test]
    fn test_connective_never_leads_or_repeats() {
        let mut cond = QueryCond::new();
        cond.or();
        assert!(cond.is_empty());

        cond.equal("a", json!(1));
        cond.and();
        cond.or();
        cond.equal("b", json!(2));
        assert_eq!(cond.to_string(), "a = 1 OR b = 2");
    }

    #[test]
    fn test_absorb_is_flat() {
        let mut group = QueryCond::new();
        group.equal("a", json!(1));
        group.equal("b", json!(2));

        let mut root = QueryCond::new();
        root.equal("x", json!(0));
        root.or();
        root.absorb(&group);

        assert_eq!(root.to_string(), "x = 0 OR a = 1 AND b = 2");
        assert_eq!(root.last(), group.last());
    }

    #[test]
    fn test_nest_and_with_closures() {
        let mut cond = QueryCond::new();
        cond.equal("a", json!(1));
        cond.or_with(|q| {
            q.is_null("b");
            q.in_list("c", vec![json!(1), json!(2)]);
        });
        cond.and_with(|_| {});

        assert_eq!(cond.to_string(), "a = 1 OR (b IS NULL AND c IN [1, 2])");
    }

    #[test]
    fn test_like_patterns() {
        let mut cond = QueryCond::new();
        cond.like("a", json!("x"));
        cond.like_left("b", json!("y"));
        cond.not_like_right("c", json!("z"));
        cond.not_between("d", json!(1), json!(5));

        assert_eq!(
            cond.to_string(),
            r#"a LIKE "%x%" AND b LIKE "%y" AND c NOT LIKE "z%" AND d NOT BETWEEN 1 AND 5"#
        );
    }

    #[test]
    fn test_serialize() {
        let mut cond = QueryCond::new();
        cond.is_not_null("a");
        cond.or();
        cond.between("b", json!(1), json!(2));

        assert_eq!(
            serde_json::to_value(&cond).unwrap(),
            json!([
                {"kind": "compare", "column": "a", "op": "is_not_null"},
                {"kind": "or"},
                {"kind": "compare", "column": "b", "op": "between", "value": [1, 2]},
            ])
        );
    }
}
