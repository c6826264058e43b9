//! Column types and value coercion.
//!
//! Record types describe their columns up front (`Record::fields`), and the
//! resulting `ColumnTypeTable` is cached per record so repeated requests skip
//! the rebuild.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Bool,
    String,
    Other,
}

impl FieldKind {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::I8
                | FieldKind::I16
                | FieldKind::I32
                | FieldKind::I64
                | FieldKind::I128
                | FieldKind::Isize
                | FieldKind::U8
                | FieldKind::U16
                | FieldKind::U32
                | FieldKind::U64
                | FieldKind::U128
                | FieldKind::Usize
        )
    }
}

/// One field of a record as the schema sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name on the record
    pub name: String,

    /// Column name; snake_case of `name` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    #[serde(rename = "type")]
    pub kind: FieldKind,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn column_name(&self) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| to_snake_case(&self.name))
    }
}

/// `UserName` -> `user_name`, `UserID` -> `user_id`, `HTTPServer` -> `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A record type whose columns can be filtered.
pub trait Record: 'static {
    fn fields() -> Vec<SchemaField>;
}

/// Column name to declared kind for one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnTypeTable {
    columns: HashMap<String, FieldKind>,
}

impl ColumnTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = SchemaField>,
    {
        let columns = fields
            .into_iter()
            .map(|field| (field.column_name(), field.kind))
            .collect();
        Self { columns }
    }

    pub fn with(mut self, column: impl Into<String>, kind: FieldKind) -> Self {
        self.columns.insert(column.into(), kind);
        self
    }

    pub fn kind_of(&self, column: &str) -> Option<FieldKind> {
        self.columns.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Converts `raw` to the column's declared type. Only the integer family
    /// is converted; a failed parse keeps the raw string.
    pub fn coerce(&self, column: &str, raw: &str, sink: &dyn DiagnosticSink) -> Value {
        match self.kind_of(column) {
            Some(kind) if kind.is_integer() => match raw.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => {
                    sink.report(Diagnostic::NotAnInteger {
                        column: column.to_string(),
                        raw_value: raw.to_string(),
                    });
                    Value::String(raw.to_string())
                }
            },
            _ => Value::String(raw.to_string()),
        }
    }
}

static GLOBAL_CACHE: Lazy<TypeTableCache> = Lazy::new(TypeTableCache::new);

/// Column tables keyed by record identity.
///
/// Lookups take the read lock only. Tables are built with no lock held, so two
/// callers missing on the same key may both build it; the second store simply
/// overwrites an identical table.
#[derive(Debug, Default)]
pub struct TypeTableCache {
    tables: RwLock<HashMap<String, Arc<ColumnTypeTable>>>,
}

impl TypeTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance.
    pub fn global() -> &'static TypeTableCache {
        &GLOBAL_CACHE
    }

    pub fn resolve<R: Record>(&self) -> Arc<ColumnTypeTable> {
        self.resolve_with(std::any::type_name::<R>(), || {
            ColumnTypeTable::from_fields(R::fields())
        })
    }

    pub fn resolve_with<F>(&self, key: &str, build: F) -> Arc<ColumnTypeTable>
    where
        F: FnOnce() -> ColumnTypeTable,
    {
        if let Some(table) = self.get(key) {
            return table;
        }

        let table = Arc::new(build());
        log::debug!("column table built for {key} ({} columns)", table.len());
        self.insert(key, table.clone());
        table
    }

    pub fn get(&self, key: &str) -> Option<Arc<ColumnTypeTable>> {
        self.tables.read().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: &str, table: Arc<ColumnTypeTable>) {
        match self.tables.write() {
            Ok(mut tables) => {
                tables.insert(key.to_string(), table);
            }
            Err(_) => log::warn!("column table cache poisoned, not caching {key}"),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectSink, IgnoreSink};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Account;

    impl Record for Account {
        fn fields() -> Vec<SchemaField> {
            vec![
                SchemaField::new("ID", FieldKind::U64),
                SchemaField::new("UserName", FieldKind::String),
                SchemaField::new("Age", FieldKind::I32).column("user_age"),
            ]
        }
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("UserName"), "user_name");
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("Address2Line"), "address2_line");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_integer_family() {
        assert!(FieldKind::U8.is_integer());
        assert!(FieldKind::Isize.is_integer());
        assert!(FieldKind::I128.is_integer());
        assert!(!FieldKind::F64.is_integer());
        assert!(!FieldKind::String.is_integer());
        assert!(!FieldKind::Bool.is_integer());
    }

    #[test]
    fn test_table_from_record_fields() {
        let table = ColumnTypeTable::from_fields(Account::fields());
        assert_eq!(table.kind_of("id"), Some(FieldKind::U64));
        assert_eq!(table.kind_of("user_name"), Some(FieldKind::String));
        assert_eq!(table.kind_of("user_age"), Some(FieldKind::I32));
        assert_eq!(table.kind_of("age"), None);
    }

    #[test]
    fn test_coerce() {
        let table = ColumnTypeTable::new()
            .with("age", FieldKind::I32)
            .with("name", FieldKind::String)
            .with("score", FieldKind::F64);

        assert_eq!(table.coerce("age", "30", &IgnoreSink), json!(30));
        assert_eq!(table.coerce("age", "-7", &IgnoreSink), json!(-7));
        assert_eq!(table.coerce("name", "30", &IgnoreSink), json!("30"));
        assert_eq!(table.coerce("score", "1.5", &IgnoreSink), json!("1.5"));
        assert_eq!(table.coerce("unknown", "30", &IgnoreSink), json!("30"));
    }

    #[test]
    fn test_coerce_failure_passes_through() {
        let table = ColumnTypeTable::new().with("age", FieldKind::U8);
        let sink = CollectSink::new();

        assert_eq!(table.coerce("age", "thirty", &sink), json!("thirty"));
        assert_eq!(
            sink.into_inner(),
            vec![Diagnostic::NotAnInteger {
                column: "age".into(),
                raw_value: "thirty".into(),
            }]
        );
    }

    #[test]
    fn test_cache_builds_once() {
        let cache = TypeTableCache::new();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            ColumnTypeTable::new().with("id", FieldKind::I64)
        };

        let first = cache.resolve_with("thing", build);
        let second = cache.resolve_with("thing", build);

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_resolve_by_type() {
        let cache = TypeTableCache::new();
        let table = cache.resolve::<Account>();
        assert_eq!(table.kind_of("id"), Some(FieldKind::U64));
        assert!(cache.get(std::any::type_name::<Account>()).is_some());
    }

    #[test]
    fn test_cache_concurrent_populate() {
        let cache = Arc::new(TypeTableCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.resolve::<Account>())
            })
            .collect();

        for handle in handles {
            let table = handle.join().unwrap();
            assert_eq!(table.len(), 3);
        }
        assert_eq!(cache.len(), 1);
    }
}
