//! Response shapes returned by the Car2DB API.
//!
//! Domain entities (makes, models, trims, ...) are passed through as opaque
//! JSON. The only shape the server needs to understand is the list response,
//! which the API returns either as a bare array or wrapped in a Hydra
//! pagination envelope.

use serde::Deserialize;

/// A list response: bare array or Hydra-enveloped page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    /// A plain JSON array.
    Bare(Vec<T>),
    /// A Hydra collection with `hydra:member` and `hydra:totalItems`.
    Enveloped {
        /// Items on this page.
        #[serde(rename = "hydra:member")]
        members: Vec<T>,
        /// Total number of items across all pages.
        #[serde(rename = "hydra:totalItems", default)]
        total: u64,
    },
}

impl<T> Listing<T> {
    /// Returns the items, regardless of shape.
    #[must_use]
    pub fn members(&self) -> &[T] {
        match self {
            Self::Bare(items) | Self::Enveloped { members: items, .. } => items,
        }
    }

    /// Consumes the listing and returns its items.
    #[must_use]
    pub fn into_members(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Enveloped { members: items, .. } => items,
        }
    }

    /// Total item count: the envelope's total, or the array length.
    #[must_use]
    pub fn total(&self) -> u64 {
        match self {
            Self::Bare(items) => items.len() as u64,
            Self::Enveloped { total, .. } => *total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn bare_array() {
        let listing: Listing<Value> =
            serde_json::from_value(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert!(matches!(listing, Listing::Bare(_)));
        assert_eq!(listing.total(), 2);
        assert_eq!(listing.into_members(), vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn hydra_envelope() {
        let listing: Listing<Value> = serde_json::from_value(json!({
            "@context": "/contexts/Make",
            "hydra:member": [{"id": 7, "name": "BMW"}],
            "hydra:totalItems": 143,
            "hydra:view": {"@id": "/makes?page=1", "@type": "hydra:PartialCollectionView"}
        }))
        .unwrap();

        assert_eq!(listing.total(), 143);
        assert_eq!(listing.members(), &[json!({"id": 7, "name": "BMW"})]);
    }

    #[test]
    fn envelope_without_total() {
        let listing: Listing<Value> =
            serde_json::from_value(json!({"hydra:member": []})).unwrap();
        assert!(listing.members().is_empty());
        assert_eq!(listing.total(), 0);
    }

    #[test]
    fn rejects_other_objects() {
        let result: Result<Listing<Value>, _> = serde_json::from_value(json!({"id": 1}));
        assert!(result.is_err());
    }
}
