//! Catalog tools: hierarchy browsing and paginated list endpoints.
//!
//! The catalog is a tree: makes → models → generations → series → trims →
//! equipments. `browse_catalog` walks it one level at a time with pagination
//! disabled; the `list_*` tools expose the paginated endpoints directly.

use std::str::FromStr;

use serde_json::Value;

use super::args::{optional_i64, required_str};
use super::{ResponseShape, ToolError, ToolRequest};
use crate::api::QueryParams;

/// A level of the catalog hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLevel {
    /// Manufacturers.
    Makes,
    /// Models of a make.
    Models,
    /// Generations (facelifts/redesigns) of a model.
    Generations,
    /// Series (body styles) within a generation.
    Series,
    /// Trims (engine/transmission variants).
    Trims,
    /// Equipment packages of a trim.
    Equipments,
}

impl CatalogLevel {
    /// All levels, top to bottom.
    pub const ALL: [Self; 6] = [
        Self::Makes,
        Self::Models,
        Self::Generations,
        Self::Series,
        Self::Trims,
        Self::Equipments,
    ];

    /// Returns the level name as used in tool arguments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Makes => "makes",
            Self::Models => "models",
            Self::Generations => "generations",
            Self::Series => "series",
            Self::Trims => "trims",
            Self::Equipments => "equipments",
        }
    }

    /// Returns the API collection path.
    #[must_use]
    pub fn path(self) -> String {
        format!("/{}", self.as_str())
    }

    /// Returns the parent-ID filters that apply to this level, in query order.
    #[must_use]
    pub const fn filters(self) -> &'static [&'static str] {
        match self {
            Self::Makes => &[],
            Self::Models => &["makeId"],
            Self::Generations => &["modelId"],
            Self::Series => &["modelId", "generationId"],
            Self::Trims => &["seriesId", "modelId"],
            Self::Equipments => &["trimId"],
        }
    }
}

impl FromStr for CatalogLevel {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ToolError::invalid(format!("Unknown catalog level: {s}")))
    }
}

/// `browse_catalog`: one level of the hierarchy, unpaginated.
pub fn browse_catalog(arguments: &Value) -> Result<ToolRequest, ToolError> {
    let level: CatalogLevel = required_str(arguments, "level")?.parse()?;

    let mut query = QueryParams::new();
    query.insert("pagination", false);
    query.insert_opt("typeId", optional_i64(arguments, "typeId")?);
    for filter in level.filters() {
        query.insert_opt(*filter, optional_i64(arguments, filter)?);
    }

    Ok(ToolRequest::new(level.path(), query, ResponseShape::Members))
}

/// `list_makes`
pub fn list_makes(arguments: &Value) -> Result<ToolRequest, ToolError> {
    paginated(
        CatalogLevel::Makes,
        arguments,
        &["page", "itemsPerPage", "typeId"],
    )
}

/// `list_models`
pub fn list_models(arguments: &Value) -> Result<ToolRequest, ToolError> {
    paginated(
        CatalogLevel::Models,
        arguments,
        &["makeId", "typeId", "page", "itemsPerPage"],
    )
}

/// `list_generations`
pub fn list_generations(arguments: &Value) -> Result<ToolRequest, ToolError> {
    paginated(
        CatalogLevel::Generations,
        arguments,
        &["modelId", "typeId", "page", "itemsPerPage"],
    )
}

/// `list_series`
pub fn list_series(arguments: &Value) -> Result<ToolRequest, ToolError> {
    paginated(
        CatalogLevel::Series,
        arguments,
        &["modelId", "generationId", "typeId", "page", "itemsPerPage"],
    )
}

/// `list_trims`
pub fn list_trims(arguments: &Value) -> Result<ToolRequest, ToolError> {
    paginated(
        CatalogLevel::Trims,
        arguments,
        &["seriesId", "modelId", "typeId", "page", "itemsPerPage"],
    )
}

/// Builds a paginated list request, passing the response through unchanged.
fn paginated(
    level: CatalogLevel,
    arguments: &Value,
    keys: &[&str],
) -> Result<ToolRequest, ToolError> {
    let mut query = QueryParams::new();
    for key in keys {
        query.insert_opt(*key, optional_i64(arguments, key)?);
    }
    Ok(ToolRequest::new(level.path(), query, ResponseShape::Raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered(request: &ToolRequest) -> Vec<String> {
        request
            .query
            .present()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }

    #[test]
    fn level_round_trip() {
        for level in CatalogLevel::ALL {
            assert_eq!(level.as_str().parse::<CatalogLevel>().unwrap(), level);
        }
        assert!("engines".parse::<CatalogLevel>().is_err());
    }

    #[test]
    fn browse_disables_pagination_first() {
        let request = browse_catalog(&json!({"level": "makes", "typeId": 2})).unwrap();
        assert_eq!(request.path, "/makes");
        assert_eq!(rendered(&request), ["pagination=false", "typeId=2"]);
        assert_eq!(request.shape, ResponseShape::Members);
    }

    #[test]
    fn browse_series_uses_both_filters() {
        let request = browse_catalog(&json!({
            "level": "series",
            "generationId": 9,
            "modelId": 4,
            "makeId": 1
        }))
        .unwrap();
        assert_eq!(request.path, "/series");
        assert_eq!(
            rendered(&request),
            ["pagination=false", "modelId=4", "generationId=9"]
        );
    }

    #[test]
    fn browse_ignores_filters_of_other_levels() {
        let request = browse_catalog(&json!({"level": "equipments", "trimId": 77, "seriesId": 3})).unwrap();
        assert_eq!(rendered(&request), ["pagination=false", "trimId=77"]);
    }

    #[test]
    fn browse_requires_valid_level() {
        assert!(browse_catalog(&json!({})).is_err());
        let err = browse_catalog(&json!({"level": "engines"})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown catalog level: engines");
    }

    #[test]
    fn list_makes_query_order() {
        let request = list_makes(&json!({"typeId": 1, "itemsPerPage": 10, "page": 2})).unwrap();
        assert_eq!(request.path, "/makes");
        assert_eq!(rendered(&request), ["page=2", "itemsPerPage=10", "typeId=1"]);
        assert_eq!(request.shape, ResponseShape::Raw);
    }

    #[test]
    fn list_trims_filters() {
        let request = list_trims(&json!({"modelId": "15", "seriesId": 8})).unwrap();
        assert_eq!(request.path, "/trims");
        assert_eq!(rendered(&request), ["seriesId=8", "modelId=15"]);
    }

    #[test]
    fn list_rejects_bad_numbers() {
        let err = list_models(&json!({"makeId": "bmw"})).unwrap_err();
        assert!(err.to_string().contains("makeId"));
    }
}
