//! HTTP/SSE transport for the MCP server.
//!
//! - `GET /sse` opens an event stream for a new session. The first event is
//!   `endpoint`, whose data is the URL to post messages to.
//! - `POST /messages?sessionId=<id>` feeds one JSON-RPC message to the
//!   session and answers `202 Accepted`. Replies arrive as `message` events.
//! - `GET /health` reports liveness.
//!
//! Every session owns its own [`McpServer`] and shares the [`ApiClient`].
//! Tool calls run as their own tasks, so one slow call never delays other
//! messages on the session. A session is removed as soon as its event stream
//! is dropped.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::mcp::protocol::OutgoingMessage;
use crate::mcp::server::{Dispatch, McpServer};

const SERVICE_NAME: &str = "car2db-mcp";

struct Session {
    server: McpServer,
    outbound: mpsc::UnboundedSender<String>,
}

/// Shared state of the SSE transport.
pub struct SseState {
    client: Arc<ApiClient>,
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SseState {
    /// Creates an empty session table backed by `client`.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (outbound, inbound) = mpsc::unbounded_channel();
        let server = McpServer::new(Arc::clone(&self.client));

        self.lock().insert(
            id,
            Session { server, outbound },
        );
        tracing::info!(session = %id, "SSE session opened");

        (id, inbound)
    }

    fn lookup(&self, id: Uuid) -> Option<(McpServer, mpsc::UnboundedSender<String>)> {
        self.lock()
            .get(&id)
            .map(|session| (session.server.clone(), session.outbound.clone()))
    }

    fn remove(&self, id: Uuid) {
        if self.lock().remove(&id).is_some() {
            tracing::info!(session = %id, "SSE session closed");
        }
    }

    /// Drops every session, ending their event streams.
    pub fn close_all(&self) {
        self.lock().clear();
    }
}

/// Removes its session when the event stream is dropped.
struct SessionGuard {
    state: Arc<SseState>,
    id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.remove(self.id);
    }
}

/// Builds the transport's router.
pub fn router(state: Arc<SseState>) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves the transport on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve<F>(listener: TcpListener, client: Arc<ApiClient>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(SseState::new(client));
    let app = router(Arc::clone(&state));

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "SSE transport listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            // event streams end once their sessions are gone
            state.close_all();
        })
        .await
}

async fn open_stream(
    State(state): State<Arc<SseState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, inbound) = state.open();
    let guard = SessionGuard { state, id };

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={id}"));

    let messages = stream::unfold((inbound, guard), |(mut inbound, guard)| async move {
        let json = inbound.recv().await?;
        let event = Event::default().event("message").data(json);
        Some((Ok::<_, Infallible>(event), (inbound, guard)))
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(raw_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };

    let Some((server, outbound)) = Uuid::parse_str(&raw_id)
        .ok()
        .and_then(|id| state.lookup(id))
    else {
        tracing::debug!(session = %raw_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    match server.dispatch(&body) {
        Dispatch::Reply(Some(reply)) => send_reply(&outbound, &reply, &raw_id),
        Dispatch::Reply(None) => {}
        Dispatch::Call(call) => {
            tokio::spawn(async move {
                send_reply(&outbound, &call.run().await, &raw_id);
            });
        }
    }

    StatusCode::ACCEPTED.into_response()
}

fn send_reply(outbound: &mpsc::UnboundedSender<String>, reply: &OutgoingMessage, session: &str) {
    match reply.to_json() {
        Ok(json) => {
            if outbound.send(json).is_err() {
                tracing::debug!(session, "Session closed before reply was sent");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialise reply"),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}
