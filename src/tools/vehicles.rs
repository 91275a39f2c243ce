//! Vehicle lookup tools: search, full trim and equipment details, year index.

use serde_json::Value;

use super::args::{optional_i64, required_i64, required_str};
use super::{ResponseShape, ToolError, ToolRequest};
use crate::api::QueryParams;

/// `search_vehicles`: free-text search; the API may page or not.
pub fn search_vehicles(arguments: &Value) -> Result<ToolRequest, ToolError> {
    let q = required_str(arguments, "q")?;

    let query = QueryParams::new()
        .with("q", Some(q))
        .with("typeId", optional_i64(arguments, "typeId")?)
        .with("yearFrom", optional_i64(arguments, "yearFrom")?)
        .with("yearTo", optional_i64(arguments, "yearTo")?);

    Ok(ToolRequest::new("/search/vehicles", query, ResponseShape::Members))
}

/// `get_trim_full`
pub fn get_trim_full(arguments: &Value) -> Result<ToolRequest, ToolError> {
    let trim_id = required_i64(arguments, "trimId")?;
    Ok(ToolRequest::new(
        format!("/trims/{trim_id}/full"),
        QueryParams::new(),
        ResponseShape::Raw,
    ))
}

/// `get_equipment_full`
pub fn get_equipment_full(arguments: &Value) -> Result<ToolRequest, ToolError> {
    let equipment_id = required_i64(arguments, "equipmentId")?;
    Ok(ToolRequest::new(
        format!("/equipments/{equipment_id}/full"),
        QueryParams::new(),
        ResponseShape::Raw,
    ))
}

/// `get_year_vehicles`
pub fn get_year_vehicles(arguments: &Value) -> Result<ToolRequest, ToolError> {
    let year = required_i64(arguments, "year")?;
    let query = QueryParams::new().with("typeId", optional_i64(arguments, "typeId")?);
    Ok(ToolRequest::new(
        format!("/years/{year}"),
        query,
        ResponseShape::Raw,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_requires_q() {
        let err = search_vehicles(&json!({"typeId": 1})).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: q");
    }

    #[test]
    fn search_query_order() {
        let request = search_vehicles(&json!({
            "yearTo": 2022,
            "q": "Toyota Camry",
            "yearFrom": 2018
        }))
        .unwrap();

        let rendered: Vec<_> = request
            .query
            .present()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        assert_eq!(rendered, ["q=Toyota Camry", "yearFrom=2018", "yearTo=2022"]);
        assert_eq!(request.shape, ResponseShape::Members);
    }

    #[test]
    fn full_detail_paths() {
        assert_eq!(get_trim_full(&json!({"trimId": 42})).unwrap().path, "/trims/42/full");
        assert_eq!(
            get_equipment_full(&json!({"equipmentId": "7"})).unwrap().path,
            "/equipments/7/full"
        );
        assert!(get_trim_full(&json!({})).is_err());
    }

    #[test]
    fn year_vehicles() {
        let request = get_year_vehicles(&json!({"year": 2020, "typeId": 3})).unwrap();
        assert_eq!(request.path, "/years/2020");
        assert!(!request.query.is_empty());

        let request = get_year_vehicles(&json!({"year": 1999})).unwrap();
        assert!(request.query.is_empty());
    }
}
