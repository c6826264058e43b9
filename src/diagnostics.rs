//! Reporting hook for everything the pipeline silently ignores.
//!
//! Malformed filters never fail a request. They are dropped (or passed through
//! unconverted) and described here instead, so callers who care can log or
//! surface them without changing what gets built.

use std::cell::RefCell;

use serde::Serialize;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("no operator found in filter `{raw}`")]
    NoOperator { raw: String },

    #[error("filter `{raw}` has more than one group qualifier")]
    NestedGroup { raw: String },

    #[error("range on `{column}` needs exactly two bounds, got `{raw_value}`")]
    MalformedRange { column: String, raw_value: String },

    #[error("`{raw_value}` is not an integer, `{column}` compared as text")]
    NotAnInteger { column: String, raw_value: String },

    #[error("gcond references unknown group `{group}` at {position}")]
    UnknownGroup { group: String, position: usize },

    #[error("gcond group `{group}` at {position} is not attached to any scope")]
    DetachedGroup { group: String, position: usize },

    #[error("gcond has an unmatched `)` at {position}")]
    UnbalancedParen { position: usize },

    #[error("gcond scope opened at {position} is never closed")]
    UnclosedScope { position: usize },
}

pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: one debug record per diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::debug!("filter ignored: {diagnostic}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreSink;

impl DiagnosticSink for IgnoreSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Keeps every diagnostic in memory, in the order reported.
#[derive(Debug, Default)]
pub struct CollectSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}

impl DiagnosticSink for CollectSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
