//! Multi-valued request parameters and their classification.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

pub const FILTER_KEY: &str = "q";
pub const GCOND_KEY: &str = "gcond";

/// Decoded query string: every key keeps all of its values in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `application/x-www-form-urlencoded` input such as
    /// `q=age%3E%3D30&q=b.name%3Dbob&gcond=a%7Cb`. A leading `?` is ignored.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .entry(key.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

impl From<HashMap<String, Vec<String>>> for QueryParams {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Vec<String>>> for QueryParams {
    fn from(values: BTreeMap<String, Vec<String>>) -> Self {
        Self { values }
    }
}

/// Pagination, sorting and projection values, kept verbatim for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassThrough {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified<'a> {
    /// Raw `q` values, in submission order
    pub filters: Vec<&'a str>,
    pub options: PassThrough,
    /// First `gcond` value; empty strings count as absent
    pub gcond: Option<&'a str>,
}

/// Sorts parameters by key. Scalars keep their last value, except `gcond`
/// which keeps its first. Unknown keys are dropped.
pub fn classify(params: &QueryParams) -> Classified<'_> {
    let mut classified = Classified::default();

    for (key, values) in &params.values {
        let last = || values.last().cloned();
        match key.as_str() {
            FILTER_KEY => classified.filters = values.iter().map(String::as_str).collect(),
            "page" => classified.options.page = last(),
            "size" => classified.options.size = last(),
            "isTotal" => classified.options.is_total = last(),
            "sort" => classified.options.sort = last(),
            "select" => classified.options.select = last(),
            "omit" => classified.options.omit = last(),
            GCOND_KEY => {
                classified.gcond = values
                    .first()
                    .map(String::as_str)
                    .filter(|gcond| !gcond.is_empty())
            }
            _ => {}
        }
    }

    classified
}
