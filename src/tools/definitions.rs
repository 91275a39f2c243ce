//! Tool definitions advertised through `tools/list`.

use serde::Serialize;
use serde_json::{json, Value};

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema,
        }
    }
}

const TYPE_ID_DESCRIPTION: &str = "Vehicle type filter: 1=cars, 2=motorcycles, 3=trucks";

fn number(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

fn type_id() -> Value {
    number(TYPE_ID_DESCRIPTION)
}

fn page() -> Value {
    number("Page number (default: 1)")
}

fn items_per_page() -> Value {
    number("Items per page (default: 30)")
}

/// Returns the list of available tools.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        // === Smart Tools ===
        ToolDefinition::new(
            "search_vehicles",
            "Search for vehicles using natural language. Examples: \"Toyota Camry 2020\", \
             \"BMW diesel SUV\", \"electric cars\". Returns models with matching trims grouped \
             by relevance.",
            json!({
                "type": "object",
                "properties": {
                    "q": {
                        "type": "string",
                        "description": "Search text (vehicle name, brand, model, etc.)"
                    },
                    "typeId": type_id(),
                    "yearFrom": number("Minimum year inclusive"),
                    "yearTo": number("Maximum year inclusive")
                },
                "required": ["q"]
            }),
        ),
        ToolDefinition::new(
            "get_trim_full",
            "Get complete vehicle trim specifications in one call. Returns: breadcrumbs \
             (make→model→generation→series→trim), key specs (engine, power, transmission), \
             all specifications grouped by category, and available equipments. Use trim IDs \
             from search_vehicles or list_trims results.",
            json!({
                "type": "object",
                "properties": {
                    "trimId": number("Trim ID")
                },
                "required": ["trimId"]
            }),
        ),
        ToolDefinition::new(
            "get_equipment_full",
            "Get full equipment/package details including all options. Returns: breadcrumbs, \
             complete list of options grouped by category. Use equipment IDs from \
             get_trim_full results.",
            json!({
                "type": "object",
                "properties": {
                    "equipmentId": number("Equipment ID")
                },
                "required": ["equipmentId"]
            }),
        ),
        ToolDefinition::new(
            "browse_catalog",
            "Navigate the vehicle catalog hierarchy step by step. Levels: makes → models → \
             generations → series → trims → equipments. Start with level=\"makes\", then \
             drill down using parent IDs from results.",
            json!({
                "type": "object",
                "properties": {
                    "level": {
                        "type": "string",
                        "enum": ["makes", "models", "generations", "series", "trims", "equipments"],
                        "description": "Catalog level to browse"
                    },
                    "makeId": number("Filter models by make"),
                    "modelId": number("Filter generations/series/trims by model"),
                    "generationId": number("Filter series by generation"),
                    "seriesId": number("Filter trims by series"),
                    "trimId": number("Filter equipments by trim"),
                    "typeId": type_id()
                },
                "required": ["level"]
            }),
        ),
        // === Low-Level Tools ===
        ToolDefinition::new(
            "list_makes",
            "List all vehicle makes (manufacturers). Supports pagination and filtering by \
             vehicle type.",
            json!({
                "type": "object",
                "properties": {
                    "page": page(),
                    "itemsPerPage": items_per_page(),
                    "typeId": type_id()
                }
            }),
        ),
        ToolDefinition::new(
            "list_models",
            "List vehicle models, optionally filtered by make. Returns model names and IDs \
             for further drill-down.",
            json!({
                "type": "object",
                "properties": {
                    "makeId": number("Filter by make"),
                    "typeId": type_id(),
                    "page": page(),
                    "itemsPerPage": items_per_page()
                }
            }),
        ),
        ToolDefinition::new(
            "list_generations",
            "List model generations (facelifts/redesigns). Filter by model to see all \
             generations of a specific model.",
            json!({
                "type": "object",
                "properties": {
                    "modelId": number("Filter by model"),
                    "typeId": type_id(),
                    "page": page(),
                    "itemsPerPage": items_per_page()
                }
            }),
        ),
        ToolDefinition::new(
            "list_series",
            "List vehicle series (body styles within a generation). Filter by model or \
             generation.",
            json!({
                "type": "object",
                "properties": {
                    "modelId": number("Filter by model"),
                    "generationId": number("Filter by generation"),
                    "typeId": type_id(),
                    "page": page(),
                    "itemsPerPage": items_per_page()
                }
            }),
        ),
        ToolDefinition::new(
            "list_trims",
            "List vehicle trims (specific engine/transmission variants). Filter by series or \
             model. Use trim IDs with get_trim_full for complete specs.",
            json!({
                "type": "object",
                "properties": {
                    "seriesId": number("Filter by series"),
                    "modelId": number("Filter by model"),
                    "typeId": type_id(),
                    "page": page(),
                    "itemsPerPage": items_per_page()
                }
            }),
        ),
        ToolDefinition::new(
            "get_year_vehicles",
            "Get all makes and models available for a specific year. Useful for exploring \
             what vehicles were produced in a given year.",
            json!({
                "type": "object",
                "properties": {
                    "year": number("Production year"),
                    "typeId": type_id()
                },
                "required": ["year"]
            }),
        ),
    ]
}
