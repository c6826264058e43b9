//! Turns HTTP-style query parameters into a composable filter condition.
//!
//! ```no_run
//! use qcond::{build_query, FieldKind, QueryParams, Record, SchemaField};
//!
//! struct User;
//!
//! impl Record for User {
//!     fn fields() -> Vec<SchemaField> {
//!         vec![
//!             SchemaField::new("ID", FieldKind::U64),
//!             SchemaField::new("Name", FieldKind::String),
//!             SchemaField::new("Age", FieldKind::I32),
//!         ]
//!     }
//! }
//!
//! let params = QueryParams::from_query_string("q=a.age%3E%3D30&q=b.name%3Dbob&gcond=a%7Cb");
//! let query = build_query::<User>(&params);
//! assert_eq!(query.condition.to_string(), r#"age >= 30 OR name = "bob""#);
//! ```

pub mod compose;
pub mod cond;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod params;
pub mod query;
pub mod schema;
pub mod token;
#[cfg(test)]
mod tests;

pub use cond::{CompareOp, Comparison, ConditionBuilder, Connective, Expr, Operand, QueryCond};
pub use config::Config;
pub use diagnostics::{CollectSink, Diagnostic, DiagnosticSink, IgnoreSink, LogSink};
pub use params::{classify, PassThrough, QueryParams};
pub use query::{build_query, ParsedQuery, QueryParser};
pub use schema::{ColumnTypeTable, FieldKind, Record, SchemaField, TypeTableCache};
pub use token::{FilterToken, GroupFilterSet, Operator, DEFAULT_GROUP};
