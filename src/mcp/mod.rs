//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the Car2DB tools to AI assistants over JSON-RPC 2.0, either on
//! stdio or over HTTP with server-sent events.
//!
//! # Architecture
//!
//! ```text
//!   stdio (transport.rs) ─┐
//!                         ├──▶ McpServer (server.rs) ──▶ tools ──▶ ApiClient
//!   HTTP/SSE (sse.rs) ────┘       one per session
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod sse;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::StdioTransport;
