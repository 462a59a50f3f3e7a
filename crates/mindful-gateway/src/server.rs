use crate::connection::{Connection, ConnectionManager};
use crate::cookie;
use crate::page::{self, PageView};
use crate::router::{MessageRouter, OutboundMessage};
use crate::sanitizer::Sanitizer;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Form, Query, State, WebSocketUpgrade,
    },
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mindful_agent::{ChatRunner, Exchange};
use mindful_core::ErrorKind;
use mindful_session::{SessionHandle, SessionRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Gateway settings that are not owned by the runner or the registry.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Longest accepted message, in characters.
    pub max_message_length: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_message_length: 4_000,
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub runner: Arc<ChatRunner>,
    pub sessions: Arc<SessionRegistry>,
    pub router: Arc<MessageRouter>,
    pub connections: Arc<ConnectionManager>,
    pub sanitizer: Sanitizer,
}

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the gateway with default settings.
    pub fn build(runner: Arc<ChatRunner>, sessions: Arc<SessionRegistry>) -> Router {
        Self::build_with_config(runner, sessions, GatewayConfig::default())
    }

    pub fn build_with_config(
        runner: Arc<ChatRunner>,
        sessions: Arc<SessionRegistry>,
        config: GatewayConfig,
    ) -> Router {
        let connections = ConnectionManager::new();
        let sanitizer = Sanitizer::new(config.max_message_length);
        let router = Arc::new(MessageRouter::new(
            runner.clone(),
            sessions.clone(),
            connections.clone(),
            sanitizer.clone(),
        ));

        let state = Arc::new(AppState {
            runner,
            sessions,
            router,
            connections,
            sanitizer,
        });

        Router::new()
            .route("/", get(index_handler))
            .route("/chat", post(chat_handler))
            .route("/api/transcript", get(transcript_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Periodically ends sessions idle for longer than `max_idle`.
    pub fn spawn_session_reaper(
        sessions: Arc<SessionRegistry>,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = sessions.evict_idle(max_idle).await;
                if evicted > 0 {
                    info!(evicted, "Ended idle sessions");
                }
            }
        })
    }
}

// --- Session resolution ---

struct ResolvedSession {
    id: Uuid,
    handle: SessionHandle,
    set_cookie: Option<HeaderValue>,
}

/// Finds the cookie's session, or starts a new one and prepares its cookie.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> ResolvedSession {
    let requested = cookie::session_id_from_headers(headers);
    let (id, handle) = state.sessions.get_or_create(requested).await;
    let set_cookie = if requested == Some(id) {
        None
    } else {
        cookie::session_cookie(id)
    };
    ResolvedSession {
        id,
        handle,
        set_cookie,
    }
}

fn with_cookie(mut response: Response, set_cookie: Option<HeaderValue>) -> Response {
    if let Some(value) = set_cookie {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

// --- Page handlers ---

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    /// Zero-based index into the preset prompts.
    pub preset: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IndexQuery>,
) -> Response {
    let resolved = resolve_session(&state, &headers).await;
    let session = resolved.handle.lock().await;

    let config_error = state
        .runner
        .client()
        .ensure_credential()
        .err()
        .map(|e| e.to_string());

    let html = page::render(&PageView {
        turns: session.all(),
        prefill: query.preset.and_then(page::preset_prompt),
        notice: None,
        config_error: config_error.as_deref(),
    });

    with_cookie(Html(html).into_response(), resolved.set_cookie)
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let resolved = resolve_session(&state, &headers).await;
    let mut session = resolved.handle.lock().await;

    let (status, notice, config_error) = match state.sanitizer.sanitize(&form.message).into_result()
    {
        Err(reason) => {
            warn!(session_id = %resolved.id, "Rejected message: {reason}");
            (StatusCode::UNPROCESSABLE_ENTITY, Some(reason), None)
        }
        Ok(message) => match state.runner.submit(&mut session, &message).await {
            Ok(Exchange::Replied(_)) | Ok(Exchange::Ignored) => (StatusCode::OK, None, None),
            Err(e) => match e.kind() {
                ErrorKind::Configuration => {
                    (StatusCode::SERVICE_UNAVAILABLE, None, Some(e.to_string()))
                }
                ErrorKind::Transport => (StatusCode::BAD_GATEWAY, Some(e.to_string()), None),
                ErrorKind::Internal => {
                    error!(session_id = %resolved.id, error = %e, "Submission failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, Some(e.to_string()), None)
                }
            },
        },
    };

    let html = page::render(&PageView {
        turns: session.all(),
        prefill: None,
        notice: notice.as_deref(),
        config_error: config_error.as_deref(),
    });

    with_cookie((status, Html(html)).into_response(), resolved.set_cookie)
}

// --- JSON handlers ---

#[derive(Debug, Serialize)]
struct TranscriptResponse<'a> {
    session_id: Uuid,
    turns: &'a [mindful_core::Turn],
}

async fn transcript_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let resolved = resolve_session(&state, &headers).await;
    let session = resolved.handle.lock().await;
    let body = Json(TranscriptResponse {
        session_id: resolved.id,
        turns: session.all(),
    });
    with_cookie(body.into_response(), resolved.set_cookie)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mindful",
        "sessions": state.sessions.len().await,
        "connections": state.connections.connection_count().await,
    }))
}

// --- WebSocket ---

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let resolved = resolve_session(&state, &headers).await;
    let session_id = resolved.id;
    let response = ws.on_upgrade(move |socket| handle_socket(socket, state, session_id));
    with_cookie(response, resolved.set_cookie)
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_id: Uuid) {
    use futures_util::{SinkExt, StreamExt};

    let connection_id = Uuid::new_v4();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for sending messages back to the WebSocket
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state
        .connections
        .add(Connection {
            id: connection_id,
            session_id,
            tx: tx.clone(),
        })
        .await;

    info!(
        connection_id = %connection_id,
        session_id = %session_id,
        "WebSocket connected"
    );

    // The welcome goes to this socket only, not the whole session
    match serde_json::to_string(&OutboundMessage::Connected {
        session_id,
        connection_id,
    }) {
        Ok(welcome) => {
            let _ = tx.send(welcome);
        }
        Err(e) => error!(error = %e, "Failed to encode welcome"),
    }
    drop(tx);

    // Task: forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Task: receive messages from WebSocket and route them, one at a time
    let router = state.router.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = router.handle_message(session_id, text.as_str()).await {
                        error!(error = %e, "Failed to handle message");
                    }
                }
                Message::Close(_) => break,
                _ => debug!(connection_id = %connection_id, "Ignoring non-text frame"),
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.connections.remove(connection_id).await;
    info!(connection_id = %connection_id, "WebSocket disconnected");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use mindful_agent::ModelConfig;
    use tower::ServiceExt;

    /// Runner whose provider is unreachable; enough for routes that never call it.
    fn app(api_key: Option<&str>) -> Router {
        let config = ModelConfig {
            api_key: api_key.map(str::to_string),
            api_base_url: Some("http://127.0.0.1:1".to_string()),
            ..ModelConfig::default()
        };
        GatewayServer::build(
            Arc::new(ChatRunner::new(config)),
            Arc::new(SessionRegistry::new()),
        )
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_sets_session_cookie() {
        let response = app(Some("key"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("mindful_session="));
        let html = body_text(response).await;
        assert!(html.contains("Quick Start Prompts"));
    }

    #[tokio::test]
    async fn test_index_prefills_preset() {
        let response = app(Some("key"))
            .oneshot(Request::get("/?preset=1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains(r#"value="How can I practice mindfulness daily?""#));
    }

    #[tokio::test]
    async fn test_index_without_credential_shows_blocking_error() {
        let response = app(None)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("GROQ_API_KEY not found"));
        assert!(!html.contains("id=\"chat-form\""));
    }

    #[tokio::test]
    async fn test_chat_without_credential_is_503() {
        let response = app(None)
            .oneshot(
                Request::post("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("message=hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let html = body_text(response).await;
        assert!(html.contains("id=\"config-error\""));
        assert!(!html.contains(r#"class="chat-message user""#));
    }

    #[tokio::test]
    async fn test_chat_rejects_oversized_message() {
        let config = ModelConfig {
            api_key: Some("key".to_string()),
            api_base_url: Some("http://127.0.0.1:1".to_string()),
            ..ModelConfig::default()
        };
        let app = GatewayServer::build_with_config(
            Arc::new(ChatRunner::new(config)),
            Arc::new(SessionRegistry::new()),
            GatewayConfig {
                max_message_length: 5,
            },
        );
        let response = app
            .oneshot(
                Request::post("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("message=far+too+long"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("Message is too long"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Some("key"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "mindful");
    }
}
