//! car2db-mcp: MCP server for the Car2DB vehicle specification API
//!
//! This library lets AI assistants query vehicle makes, models, generations,
//! series, trims and equipment through structured tool calls instead of raw
//! HTTP.
//!
//! # Architecture
//!
//! - **Fetch client**: builds URLs, injects authentication, bounds every
//!   attempt with a timeout, retries transient failures with exponential
//!   backoff and normalises errors
//! - **Tools**: ten parameter-shaping handlers on top of the client
//! - **MCP**: JSON-RPC 2.0 over stdio or HTTP/SSE
//!
//! Response payloads are passed through as opaque JSON.
//!
//! # Modules
//!
//! - [`api`]: Resilient fetch client and error normalisation
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Configuration error types
//! - [`mcp`]: MCP protocol implementation and transports
//! - [`tools`]: Tool definitions and handlers

pub mod api;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
