//! The Car2DB tools exposed over MCP.
//!
//! Each tool is pure parameter shaping: it turns call arguments into a
//! [`ToolRequest`] (path, ordered query, response shape) which is then
//! executed by the shared [`ApiClient`]. No tool holds state or policy.
//!
//! # Tools
//!
//! - **Smart tools**: `search_vehicles`, `get_trim_full`, `get_equipment_full`,
//!   `browse_catalog`
//! - **Low-level tools**: `list_makes`, `list_models`, `list_generations`,
//!   `list_series`, `list_trims`, `get_year_vehicles`

pub mod args;
pub mod catalog;
mod definitions;
pub mod vehicles;

pub use definitions::{definitions, ToolDefinition};

use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiClient, FetchError, Listing, QueryParams};

/// Errors raised while handling a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name exists.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were missing or could not be coerced.
    #[error("{0}")]
    InvalidArguments(String),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] FetchError),
}

impl ToolError {
    /// Creates an invalid arguments error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }
}

/// How the API response is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Pass the JSON through unchanged.
    Raw,
    /// Decode as a [`Listing`] and return only its members.
    Members,
}

/// A shaped API request for one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Server-relative API path.
    pub path: String,
    /// Query parameters, in the order they are sent.
    pub query: QueryParams,
    /// How to shape the response.
    pub shape: ResponseShape,
}

impl ToolRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(path: impl Into<String>, query: QueryParams, shape: ResponseShape) -> Self {
        Self {
            path: path.into(),
            query,
            shape,
        }
    }

    /// Shapes the request for the named tool.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tools or invalid arguments.
    pub fn for_tool(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        match name {
            "search_vehicles" => vehicles::search_vehicles(arguments),
            "get_trim_full" => vehicles::get_trim_full(arguments),
            "get_equipment_full" => vehicles::get_equipment_full(arguments),
            "browse_catalog" => catalog::browse_catalog(arguments),
            "list_makes" => catalog::list_makes(arguments),
            "list_models" => catalog::list_models(arguments),
            "list_generations" => catalog::list_generations(arguments),
            "list_series" => catalog::list_series(arguments),
            "list_trims" => catalog::list_trims(arguments),
            "get_year_vehicles" => vehicles::get_year_vehicles(arguments),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Executes the request against the API.
    ///
    /// # Errors
    ///
    /// Returns the API client's error if the request fails.
    pub async fn execute(&self, client: &ApiClient) -> Result<Value, ToolError> {
        match self.shape {
            ResponseShape::Raw => Ok(client.get(&self.path, &self.query).await?),
            ResponseShape::Members => {
                let listing: Listing<Value> = client.get(&self.path, &self.query).await?;
                Ok(Value::Array(listing.into_members()))
            }
        }
    }
}

/// Runs the named tool with the given arguments.
///
/// # Errors
///
/// Returns an error for unknown tools, invalid arguments, or API failures.
pub async fn call_tool(client: &ApiClient, name: &str, arguments: &Value) -> Result<Value, ToolError> {
    let request = ToolRequest::for_tool(name, arguments)?;
    tracing::debug!(tool = name, path = %request.path, "Executing tool");
    request.execute(client).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientConfig;
    use serde_json::json;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(ClientConfig::new("test-key").with_base_url(base_url)).unwrap()
    }

    #[test]
    fn every_definition_is_dispatchable() {
        for definition in definitions() {
            let result = ToolRequest::for_tool(&definition.name, &json!({}));
            assert!(
                !matches!(result, Err(ToolError::UnknownTool(_))),
                "{} is not dispatched",
                definition.name
            );
        }
    }

    #[test]
    fn unknown_tool() {
        let err = ToolRequest::for_tool("drop_tables", &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: drop_tables");
    }

    #[tokio::test]
    async fn search_extracts_hydra_members() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/vehicles?q=Camry")
            .with_status(200)
            .with_body(r#"{"hydra:member": [{"id": 1}, {"id": 2}], "hydra:totalItems": 2}"#)
            .create_async()
            .await;

        let result = call_tool(&client(&server.url()), "search_vehicles", &json!({"q": "Camry"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, json!([{"id": 1}, {"id": 2}]));
    }

    #[tokio::test]
    async fn search_passes_bare_array_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search/vehicles?q=Camry")
            .with_status(200)
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;

        let result = call_tool(&client(&server.url()), "search_vehicles", &json!({"q": "Camry"}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, json!([{"id": 1}, {"id": 2}]));
    }

    #[tokio::test]
    async fn list_returns_envelope_unchanged() {
        let body = json!({
            "hydra:member": [{"id": 5, "name": "BMW"}],
            "hydra:totalItems": 120,
            "hydra:view": {"@id": "/makes?page=2", "hydra:next": "/makes?page=3"}
        });

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/makes?page=2&itemsPerPage=10")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let result = call_tool(
            &client(&server.url()),
            "list_makes",
            &json!({"page": 2, "itemsPerPage": 10}),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn api_errors_are_propagated() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/trims/1/full")
            .with_status(401)
            .with_body(r#"{"message": "Invalid API key"}"#)
            .create_async()
            .await;

        let err = call_tool(&client(&server.url()), "get_trim_full", &json!({"trimId": 1}))
            .await
            .unwrap_err();

        let ToolError::Api(fetch) = err else {
            panic!("Expected an API error");
        };
        let api = fetch.api_error().unwrap();
        assert_eq!(api.status, 401);
        assert!(api.hint.contains("https://car2db.com/api/"));
    }
}
