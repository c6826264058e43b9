//! Filter token parser.
//!
//! A raw `q` value looks like `[group.]column<op>value`. The operator is found
//! by substring search over a fixed precedence list, then the value is split
//! off at the operator's first occurrence.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Group used when a column carries no `group.` prefix.
pub const DEFAULT_GROUP: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = "!~<=")]
    NotLikeLeft,
    #[serde(rename = "!~>=")]
    NotLikeRight,
    #[serde(rename = "~<=")]
    LikeLeft,
    #[serde(rename = "~>=")]
    LikeRight,
    #[serde(rename = "!?=")]
    NotIn,
    #[serde(rename = "!^=")]
    NotBetween,
    #[serde(rename = "!~=")]
    NotLike,
    #[serde(rename = "?=")]
    In,
    #[serde(rename = "^=")]
    Between,
    #[serde(rename = "~=")]
    Like,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl Operator {
    /// Match order. Several symbols contain others (`<=` is inside `~<=` and
    /// `!~<=`), so the longer ones must be tried first.
    pub const PRECEDENCE: [Operator; 16] = [
        Operator::NotLikeLeft,
        Operator::NotLikeRight,
        Operator::LikeLeft,
        Operator::LikeRight,
        Operator::NotIn,
        Operator::NotBetween,
        Operator::NotLike,
        Operator::In,
        Operator::Between,
        Operator::Like,
        Operator::Ne,
        Operator::Ge,
        Operator::Le,
        Operator::Eq,
        Operator::Gt,
        Operator::Lt,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::NotLikeLeft => "!~<=",
            Operator::NotLikeRight => "!~>=",
            Operator::LikeLeft => "~<=",
            Operator::LikeRight => "~>=",
            Operator::NotIn => "!?=",
            Operator::NotBetween => "!^=",
            Operator::NotLike => "!~=",
            Operator::In => "?=",
            Operator::Between => "^=",
            Operator::Like => "~=",
            Operator::Ne => "!=",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
        }
    }

    /// First operator in precedence order whose symbol occurs anywhere in `raw`.
    pub fn resolve(raw: &str) -> Option<Operator> {
        Self::PRECEDENCE
            .into_iter()
            .find(|op| raw.contains(op.symbol()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterToken {
    pub group: String,
    pub column: String,
    pub operator: Operator,
    pub raw_value: String,
}

impl FilterToken {
    pub fn parse(raw: &str) -> Result<Self, Diagnostic> {
        let operator = Operator::resolve(raw).ok_or_else(|| Diagnostic::NoOperator {
            raw: raw.to_string(),
        })?;

        // resolve() guarantees the symbol is present
        let (left, value) = raw
            .split_once(operator.symbol())
            .ok_or_else(|| Diagnostic::NoOperator {
                raw: raw.to_string(),
            })?;

        let parts: Vec<&str> = left.split('.').collect();
        let (group, column) = match parts.as_slice() {
            [column] => (DEFAULT_GROUP, *column),
            [group, column] => (*group, *column),
            _ => {
                return Err(Diagnostic::NestedGroup {
                    raw: raw.to_string(),
                })
            }
        };

        Ok(Self {
            group: group.to_string(),
            column: column.to_string(),
            operator,
            raw_value: value.to_string(),
        })
    }
}

/// Tokens bucketed by group, each bucket in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupFilterSet {
    groups: BTreeMap<String, Vec<FilterToken>>,
}

impl GroupFilterSet {
    pub fn from_raw<'a, I>(values: I, sink: &dyn DiagnosticSink) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = Self::default();
        for raw in values {
            match FilterToken::parse(raw) {
                Ok(token) => set.push(token),
                Err(diagnostic) => sink.report(diagnostic),
            }
        }
        set
    }

    pub fn push(&mut self, token: FilterToken) {
        self.groups
            .entry(token.group.clone())
            .or_default()
            .push(token);
    }

    pub fn get(&self, group: &str) -> Option<&[FilterToken]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FilterToken])> {
        self.groups
            .iter()
            .map(|(name, tokens)| (name.as_str(), tokens.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
