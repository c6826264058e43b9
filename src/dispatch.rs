//! Operator dispatch: turns one filter token into one comparison node.

use serde_json::Value;

use crate::cond::ConditionBuilder;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::schema::ColumnTypeTable;
use crate::token::{FilterToken, Operator};

/// Appends the comparison for `token` to `cond`. Malformed ranges append nothing.
pub fn apply<B: ConditionBuilder>(
    cond: &mut B,
    table: &ColumnTypeTable,
    token: &FilterToken,
    sink: &dyn DiagnosticSink,
) {
    let column = token.column.as_str();
    let raw = token.raw_value.as_str();
    let coerce = |value: &str| table.coerce(column, value, sink);

    match token.operator {
        Operator::Eq if is_null_sentinel(raw) => cond.is_null(column),
        Operator::Eq => cond.equal(column, coerce(raw)),
        Operator::Ne if is_null_sentinel(raw) => cond.is_not_null(column),
        Operator::Ne => cond.not_equal(column, coerce(raw)),
        Operator::Gt => cond.gt(column, coerce(raw)),
        Operator::Ge => cond.ge(column, coerce(raw)),
        Operator::Lt => cond.lt(column, coerce(raw)),
        Operator::Le => cond.le(column, coerce(raw)),
        Operator::Like => cond.like(column, coerce(raw)),
        Operator::NotLike => cond.not_like(column, coerce(raw)),
        Operator::LikeLeft => cond.like_left(column, coerce(raw)),
        Operator::NotLikeLeft => cond.not_like_left(column, coerce(raw)),
        Operator::LikeRight => cond.like_right(column, coerce(raw)),
        Operator::NotLikeRight => cond.not_like_right(column, coerce(raw)),
        Operator::In => cond.in_list(column, raw.split(',').map(coerce).collect()),
        Operator::NotIn => cond.not_in(column, raw.split(',').map(coerce).collect()),
        Operator::Between => {
            if let Some((low, high)) = bounds(token, coerce, sink) {
                cond.between(column, low, high);
            }
        }
        Operator::NotBetween => {
            if let Some((low, high)) = bounds(token, coerce, sink) {
                cond.not_between(column, low, high);
            }
        }
    }
}

fn is_null_sentinel(raw: &str) -> bool {
    raw.to_lowercase() == "null"
}

fn bounds<F>(token: &FilterToken, coerce: F, sink: &dyn DiagnosticSink) -> Option<(Value, Value)>
where
    F: Fn(&str) -> Value,
{
    match token.raw_value.split(',').collect::<Vec<_>>().as_slice() {
        [low, high] => Some((coerce(*low), coerce(*high))),
        _ => {
            sink.report(Diagnostic::MalformedRange {
                column: token.column.clone(),
                raw_value: token.raw_value.clone(),
            });
            None
        }
    }
}
