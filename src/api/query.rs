//! Ordered query parameters for API requests.

use indexmap::IndexMap;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value (rendered as `true`/`false`).
    Bool(bool),
}

impl std::fmt::Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Query parameters in caller insertion order.
///
/// Absent (`None`) values are kept in the map but never rendered, so callers
/// can pass optional tool arguments straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: IndexMap<String, Option<QueryValue>>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter. Re-setting a key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> &mut Self {
        self.entries.insert(key.into(), Some(value.into()));
        self
    }

    /// Sets a parameter that may be absent.
    pub fn insert_opt<V: Into<QueryValue>>(
        &mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        self.entries.insert(key.into(), value.map(Into::into));
        self
    }

    /// Builder-style variant of [`insert_opt`](Self::insert_opt).
    #[must_use]
    pub fn with<V: Into<QueryValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert_opt(key, value);
        self
    }

    /// Iterates over present parameters, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v)))
    }

    /// Returns `true` if no parameter would be rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut params = QueryParams::new();
        params.insert("page", 2).insert("itemsPerPage", 10).insert("q", "bmw");

        let keys: Vec<_> = params.present().map(|(k, _)| k).collect();
        assert_eq!(keys, ["page", "itemsPerPage", "q"]);
    }

    #[test]
    fn absent_values_are_skipped() {
        let params = QueryParams::new()
            .with("makeId", Some(5))
            .with::<i64>("typeId", None)
            .with("page", Some(1));

        let rendered: Vec<_> = params
            .present()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        assert_eq!(rendered, ["makeId=5", "page=1"]);
    }

    #[test]
    fn only_absent_values_is_empty() {
        let params = QueryParams::new().with::<i64>("typeId", None);
        assert!(params.is_empty());
        assert!(QueryParams::new().is_empty());
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut params = QueryParams::new();
        params.insert("a", 1).insert("b", 2).insert("a", 3);

        let rendered: Vec<_> = params.present().map(|(k, v)| format!("{k}={v}")).collect();
        assert_eq!(rendered, ["a=3", "b=2"]);
    }

    #[test]
    fn bool_renders_lowercase() {
        assert_eq!(QueryValue::from(false).to_string(), "false");
        assert_eq!(QueryValue::from(true).to_string(), "true");
    }
}
