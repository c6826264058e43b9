//! Group composition (`gcond`).
//!
//! A `gcond` string combines the per-group accumulators into one condition.
//! Its alphabet is single-character group names plus four symbols:
//!
//! - `*x` merges group `x` into the current scope with AND
//! - `|x` merges group `x` into the current scope with OR
//! - `(x` opens a nested scope seeded with group `x`, joined to the enclosing
//!   scope with OR when the `(` follows a `|`, with AND otherwise
//! - `)` closes the innermost scope
//!
//! A group that leads its scope (`a` in `a|b`) is merged by the combinator
//! that follows it. A reference with no combinator or `(` attached to it is
//! never merged: `a` on its own composes to an empty condition, and so does
//! the `a` in `a(b)`. Unknown group names are skipped.
//!
//! Everything is resolved in one left-to-right pass over the tokens with an
//! explicit scope stack; nothing here fails.

mod lexer;

use std::collections::BTreeMap;

pub use lexer::{tokenize, Token};

use crate::cond::{ConditionBuilder, Connective};
use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Composes `groups` according to `gcond` and returns the root scope.
pub fn compose<B: ConditionBuilder>(
    gcond: &str,
    groups: &BTreeMap<String, B>,
    sink: &dyn DiagnosticSink,
) -> B {
    Composer::new(tokenize(gcond), groups, sink).run()
}

struct Scope<B> {
    cond: B,
    connective: Connective,
    opened_at: usize,
}

struct Composer<'a, B> {
    tokens: Vec<Token>,
    groups: &'a BTreeMap<String, B>,
    sink: &'a dyn DiagnosticSink,
    root: B,
    open: Vec<Scope<B>>,
    /// Group references already looked up, by token position
    attached: Vec<bool>,
}

impl<'a, B: ConditionBuilder> Composer<'a, B> {
    fn new(
        tokens: Vec<Token>,
        groups: &'a BTreeMap<String, B>,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        let attached = vec![false; tokens.len()];
        Self {
            tokens,
            groups,
            sink,
            root: B::default(),
            open: Vec::new(),
            attached,
        }
    }

    fn run(mut self) -> B {
        let len = self.tokens.len();
        for pos in 0..len {
            let is_last = pos + 1 == len;
            match self.tokens[pos] {
                Token::LParen if !is_last => self.open_scope(pos),
                Token::Or if !is_last => self.combine(Connective::Or, pos),
                Token::And if !is_last => self.combine(Connective::And, pos),
                Token::RParen => self.close_scope(pos),
                _ => {}
            }
        }

        while let Some(scope) = self.open.last() {
            self.sink.report(Diagnostic::UnclosedScope {
                position: scope.opened_at,
            });
            self.pop_scope();
        }

        self.report_detached();
        self.root
    }

    fn current(&mut self) -> &mut B {
        match self.open.last_mut() {
            Some(scope) => &mut scope.cond,
            None => &mut self.root,
        }
    }

    fn open_scope(&mut self, pos: usize) {
        let connective = if pos > 0 && self.tokens[pos - 1] == Token::Or {
            Connective::Or
        } else {
            Connective::And
        };

        let mut cond = B::default();
        if let Some(group) = self.lookup(pos + 1) {
            cond.absorb(group);
        }
        self.open.push(Scope {
            cond,
            connective,
            opened_at: pos,
        });
    }

    fn combine(&mut self, connective: Connective, pos: usize) {
        // leading operand of the scope, e.g. `a` in `a|b`
        if pos > 0 && self.current().is_empty() && !self.attached[pos - 1] {
            if let Some(lead) = self.lookup(pos - 1) {
                self.current().absorb(lead);
            }
        }

        if let Some(group) = self.lookup(pos + 1) {
            let cond = self.current();
            cond.connect(connective);
            cond.absorb(group);
        }
    }

    fn close_scope(&mut self, pos: usize) {
        if self.open.is_empty() {
            self.sink
                .report(Diagnostic::UnbalancedParen { position: pos });
            return;
        }
        self.pop_scope();
    }

    fn pop_scope(&mut self) {
        if let Some(scope) = self.open.pop() {
            self.current().nest(scope.connective, scope.cond);
        }
    }

    /// Resolves the group named at `pos`, if that token is a group reference.
    fn lookup(&mut self, pos: usize) -> Option<&'a B> {
        let Some(Token::Group(name)) = self.tokens.get(pos).copied() else {
            return None;
        };
        self.attached[pos] = true;

        let groups = self.groups;
        let key = name.to_string();
        let group = groups.get(key.as_str());
        if group.is_none() {
            self.sink.report(Diagnostic::UnknownGroup {
                group: key,
                position: pos,
            });
        }
        group
    }

    fn report_detached(&self) {
        for (pos, token) in self.tokens.iter().enumerate() {
            if let Token::Group(name) = token {
                if !self.attached[pos] {
                    self.sink.report(Diagnostic::DetachedGroup {
                        group: name.to_string(),
                        position: pos,
                    });
                }
            }
        }
    }
}
