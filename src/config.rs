use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::schema::{ColumnTypeTable, SchemaField, TypeTableCache};

/// Filterable columns of one record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Record used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_record: Option<String>,
    #[serde(default)]
    pub records: BTreeMap<String, RecordSchema>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&config_str).with_context(|| format!("config {} is malformed", path.display()))
    }

    pub fn parse(config_str: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, record) in &self.records {
            let mut seen = HashSet::new();
            for field in &record.fields {
                let column = field.column_name();
                if !seen.insert(column.clone()) {
                    bail!("record `{name}` maps more than one field to column `{column}`");
                }
            }
        }

        if let Some(default) = &self.default_record {
            if !self.records.contains_key(default) {
                bail!("default_record `{default}` is not a configured record");
            }
        }

        Ok(())
    }

    pub fn table(&self, record: &str) -> Option<ColumnTypeTable> {
        self.records
            .get(record)
            .map(|schema| ColumnTypeTable::from_fields(schema.fields.iter().cloned()))
    }

    /// Column table for `record`, cached in `cache` under `config:<record>`.
    pub fn resolve(&self, cache: &TypeTableCache, record: &str) -> Option<Arc<ColumnTypeTable>> {
        let schema = self.records.get(record)?;
        let key = format!("config:{record}");
        Some(cache.resolve_with(&key, || {
            ColumnTypeTable::from_fields(schema.fields.iter().cloned())
        }))
    }
}

/// Column table for the CLI's `--config`/`--record` pair.
///
/// Without a config file every value stays a string. `record` falls back to the
/// config's `default_record`.
pub fn column_table(
    config: Option<&Path>,
    record: Option<String>,
    cache: &TypeTableCache,
) -> anyhow::Result<Arc<ColumnTypeTable>> {
    let Some(path) = config else {
        if let Some(record) = record {
            bail!("--record {record} needs a --config to look it up in");
        }
        return Ok(Arc::new(ColumnTypeTable::new()));
    };

    let config = Config::load(path)?;
    let Some(record) = record.or_else(|| config.default_record.clone()) else {
        log::warn!("no record selected, values will not be coerced");
        return Ok(Arc::new(ColumnTypeTable::new()));
    };

    config
        .resolve(cache, &record)
        .with_context(|| format!("record `{record}` is not defined in {}", path.display()))
}
