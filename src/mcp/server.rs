//! MCP server implementation for the Car2DB API.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation; the client's name and
//!    version become the API referer
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! [`McpServer`] holds the state of one session and is independent of the
//! transport. Lifecycle requests are answered immediately; `tools/call`
//! becomes a [`PendingToolCall`] that the transport runs as its own task, so
//! a slow upstream never holds up `ping` or other calls on the session.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{MessageWriter, StdioTransport};
use crate::tools::{self, ToolError};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

impl ClientInfo {
    /// Returns the referer identifying this client: `name/version`.
    #[must_use]
    pub fn referer(&self) -> String {
        match self.version.as_deref() {
            Some(version) if !version.is_empty() => format!("{}/{version}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Converts a tool failure into an error result.
    ///
    /// API failures carry the normalised error as JSON details; dispatch
    /// failures (unknown tool, bad arguments) are reported as plain text.
    #[must_use]
    pub fn from_tool_error(err: &ToolError) -> Self {
        match err {
            ToolError::Api(fetch) => Self::error(pretty(&json!({
                "error": fetch.to_string(),
                "details": fetch.api_error(),
            }))),
            other => Self::error(other.to_string()),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}


/// Lifecycle state of one session.
#[derive(Debug)]
struct Session {
    state: ServerState,
    protocol_version: Option<String>,
}

/// Outcome of handing one line to the server.
pub enum Dispatch {
    /// Handled immediately; the reply, if any, can be sent right away.
    Reply(Option<OutgoingMessage>),
    /// A validated tool call to run independently of the session.
    Call(PendingToolCall),
}

/// A `tools/call` request that passed lifecycle and parameter checks.
pub struct PendingToolCall {
    client: Arc<ApiClient>,
    id: RequestId,
    params: ToolCallParams,
}

impl PendingToolCall {
    /// Returns the name of the requested tool.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.params.name
    }

    /// Runs the tool and builds the reply.
    pub async fn run(self) -> OutgoingMessage {
        let Self { client, id, params } = self;

        let result = match tools::call_tool(&client, &params.name, &params.arguments).await {
            Ok(value) => ToolCallResult::text(pretty(&value)),
            Err(err) => {
                tracing::warn!(tool = %params.name, error = %err, "Tool call failed");
                ToolCallResult::from_tool_error(&err)
            }
        };

        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(id, value).into(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise tool call result");
                JsonRpcError::internal_error(id, "Internal error: failed to serialise result")
                    .into()
            }
        }
    }
}

/// One MCP session backed by the shared Car2DB client.
///
/// Clones are handles to the same session.
#[derive(Clone)]
pub struct McpServer {
    /// Lifecycle state, locked only for synchronous checks and updates.
    session: Arc<Mutex<Session>>,
    /// Client for the upstream API.
    client: Arc<ApiClient>,
}

impl McpServer {
    /// Creates a new session using the given API client.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session {
                state: ServerState::AwaitingInit,
                protocol_version: None,
            })),
            client,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current server state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.session().state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<String> {
        self.session().protocol_version.clone()
    }

    fn set_state(&self, state: ServerState) {
        self.session().state = state;
    }

    /// Runs the server on stdin/stdout with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&self) -> io::Result<()> {
        self.run_with_shutdown(StdioTransport::new()).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown<R, W>(&self, transport: StdioTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let (mut reader, writer) = transport.into_split();
        let (replies, writer_task) = spawn_writer(writer);

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.set_state(ServerState::ShuttingDown);
                    writer_task.abort();
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.set_state(ServerState::ShuttingDown);
                    writer_task.abort();
                    return Ok(());
                }

                line_result = reader.read_line() => {
                    let Some(line) = line_result? else {
                        break;
                    };
                    if !self.route_line(&line, &replies) {
                        break;
                    }
                }
            }
        }

        self.finish(replies, writer_task).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown<R, W>(&self, transport: StdioTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let (mut reader, writer) = transport.into_split();
        let (replies, writer_task) = spawn_writer(writer);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.set_state(ServerState::ShuttingDown);
                    writer_task.abort();
                    return Ok(());
                }

                line_result = reader.read_line() => {
                    let Some(line) = line_result? else {
                        break;
                    };
                    if !self.route_line(&line, &replies) {
                        break;
                    }
                }
            }
        }

        self.finish(replies, writer_task).await
    }

    /// Serves messages from `transport` until EOF, without signal handling.
    ///
    /// Returns once every in-flight tool call has replied.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&self, transport: StdioTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (mut reader, writer) = transport.into_split();
        let (replies, writer_task) = spawn_writer(writer);

        while let Some(line) = reader.read_line().await? {
            if !self.route_line(&line, &replies) {
                break;
            }
        }

        self.finish(replies, writer_task).await
    }

    /// Sends the reply for `line`, spawning tool calls.
    ///
    /// Returns `false` once the writer has stopped.
    fn route_line(&self, line: &str, replies: &mpsc::UnboundedSender<OutgoingMessage>) -> bool {
        match self.dispatch(line) {
            Dispatch::Reply(None) => !replies.is_closed(),
            Dispatch::Reply(Some(reply)) => replies.send(reply).is_ok(),
            Dispatch::Call(call) => {
                let reply_tx = replies.clone();
                tokio::spawn(async move {
                    if reply_tx.send(call.run().await).is_err() {
                        tracing::debug!("Writer closed before tool call reply was sent");
                    }
                });
                !replies.is_closed()
            }
        }
    }

    /// Waits for outstanding replies to be written after input ends.
    async fn finish(
        &self,
        replies: mpsc::UnboundedSender<OutgoingMessage>,
        writer_task: JoinHandle<io::Result<()>>,
    ) -> io::Result<()> {
        tracing::debug!("stdin closed");
        self.set_state(ServerState::ShuttingDown);

        // the writer ends once every in-flight call has dropped its sender
        drop(replies);
        writer_task.await.map_err(io::Error::other)?
    }

    /// Handles one raw JSON-RPC line and returns the reply, if any.
    ///
    /// Blank lines and notifications produce no reply.
    pub async fn handle_line(&self, line: &str) -> Option<OutgoingMessage> {
        match self.dispatch(line) {
            Dispatch::Reply(reply) => reply,
            Dispatch::Call(call) => Some(call.run().await),
        }
    }

    /// Handles one raw JSON-RPC line without waiting on the upstream API.
    pub fn dispatch(&self, line: &str) -> Dispatch {
        if line.trim().is_empty() {
            return Dispatch::Reply(None);
        }

        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.dispatch_request(&req),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                Dispatch::Reply(None)
            }
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                Dispatch::Reply(Some(error.into()))
            }
        }
    }

    /// Handles an incoming request.
    fn dispatch_request(&self, req: &JsonRpcRequest) -> Dispatch {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => match self.prepare_tool_call(req) {
                Ok(call) => return Dispatch::Call(call),
                Err(error) => Err(error),
            },
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        Dispatch::Reply(Some(match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        }))
    }

    /// Handles an incoming notification.
    fn handle_notification(&self, notif: &JsonRpcNotification) {
        let mut session = self.session();
        if notif.method == "notifications/initialized" && session.state == ServerState::Initialising {
            session.state = ServerState::Running;
            tracing::debug!("Session running");
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let mut session = self.session();
        if session.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                ErrorCode::InvalidRequest,
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req.parse_params("initialize")?;

        if let Some(ref client_info) = params.client_info {
            let referer = client_info.referer();
            tracing::info!(client = %referer, "Client connected");
            self.client.set_referer(referer);
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();
        tracing::debug!(
            requested = %params.protocol_version,
            negotiated = %negotiated_version,
            "Protocol version negotiated"
        );

        session.protocol_version = Some(negotiated_version.clone());
        session.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": negotiated_version,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        ))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialised(&req.id)?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools::definitions() }),
        ))
    }

    /// Validates a tools/call request.
    fn prepare_tool_call(&self, req: &JsonRpcRequest) -> Result<PendingToolCall, JsonRpcError> {
        self.require_initialised(&req.id)?;

        let params: ToolCallParams = req.parse_params("tool call")?;

        Ok(PendingToolCall {
            client: Arc::clone(&self.client),
            id: req.id.clone(),
            params,
        })
    }

    /// Ensures `initialize` has been handled.
    fn require_initialised(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        match self.session().state {
            ServerState::Initialising | ServerState::Running => Ok(()),
            ServerState::AwaitingInit | ServerState::ShuttingDown => Err(JsonRpcError::new(
                Some(id.clone()),
                ErrorCode::InvalidRequest,
                "Server not initialised",
            )),
        }
    }
}

/// Spawns the single task that writes replies in the order they are queued.
fn spawn_writer<W>(
    mut writer: MessageWriter<W>,
) -> (mpsc::UnboundedSender<OutgoingMessage>, JoinHandle<io::Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (replies, mut queue) = mpsc::unbounded_channel::<OutgoingMessage>();

    let task = tokio::spawn(async move {
        while let Some(reply) = queue.recv().await {
            writer.write_message(&reply).await?;
        }
        Ok(())
    });

    (replies, task)
}
