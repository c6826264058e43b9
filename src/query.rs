//! End-to-end pipeline: parameters in, composed condition out.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::compose::compose;
use crate::cond::QueryCond;
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::dispatch;
use crate::params::{classify, PassThrough, QueryParams};
use crate::schema::{ColumnTypeTable, Record, TypeTableCache};
use crate::token::{GroupFilterSet, DEFAULT_GROUP};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// Composed condition, or the `default` group's when there is no `gcond`
    pub condition: QueryCond,
    /// Accumulator per group name
    pub groups: BTreeMap<String, QueryCond>,
    pub options: PassThrough,
}

pub struct QueryParser<'a> {
    table: Arc<ColumnTypeTable>,
    sink: &'a dyn DiagnosticSink,
}

impl QueryParser<'static> {
    pub fn new(table: Arc<ColumnTypeTable>) -> Self {
        Self {
            table,
            sink: &LogSink,
        }
    }

    /// Column types of `R`, cached process-wide.
    pub fn for_record<R: Record>() -> Self {
        Self::with_cache::<R>(TypeTableCache::global())
    }

    pub fn with_cache<R: Record>(cache: &TypeTableCache) -> Self {
        Self::new(cache.resolve::<R>())
    }
}

impl<'a> QueryParser<'a> {
    pub fn with_sink<'b>(self, sink: &'b dyn DiagnosticSink) -> QueryParser<'b> {
        QueryParser {
            table: self.table,
            sink,
        }
    }

    pub fn parse(&self, params: &QueryParams) -> ParsedQuery {
        let classified = classify(params);
        let _span = tracing::debug_span!(
            "parse_query",
            filters = classified.filters.len(),
            gcond = classified.gcond.unwrap_or_default()
        )
        .entered();

        let tokens = GroupFilterSet::from_raw(classified.filters.iter().copied(), self.sink);
        let groups = self.build_groups(&tokens);

        let condition = match classified.gcond {
            Some(gcond) => compose(gcond, &groups, self.sink),
            None => groups.get(DEFAULT_GROUP).cloned().unwrap_or_default(),
        };

        log::debug!(
            "query parsed: {} groups, {} comparisons in condition",
            groups.len(),
            condition.comparison_count()
        );

        ParsedQuery {
            condition,
            groups,
            options: classified.options,
        }
    }

    pub fn parse_query_string(&self, query: &str) -> ParsedQuery {
        self.parse(&QueryParams::from_query_string(query))
    }

    /// One accumulator per group; tokens of a group are joined with AND.
    pub fn build_groups(&self, tokens: &GroupFilterSet) -> BTreeMap<String, QueryCond> {
        tokens
            .iter()
            .map(|(group, tokens)| {
                let mut cond = QueryCond::new();
                for token in tokens {
                    dispatch::apply(&mut cond, &self.table, token, self.sink);
                }
                (group.to_string(), cond)
            })
            .collect()
    }
}

/// Parses `params` against `R`'s columns using the process-wide type cache.
pub fn build_query<R: Record>(params: &QueryParams) -> ParsedQuery {
    QueryParser::for_record::<R>().parse(params)
}
