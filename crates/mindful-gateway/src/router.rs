use crate::connection::ConnectionManager;
use crate::sanitizer::Sanitizer;
use mindful_agent::{ChatRunner, Exchange, StreamEvent};
use mindful_core::{ErrorKind, MindfulError, MindfulResult};
use mindful_session::SessionRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub content: String,
}

/// Events pushed to the WebSocket clients of a session.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Connected {
        session_id: Uuid,
        connection_id: Uuid,
    },
    /// A completion request is in flight.
    Thinking { session_id: Uuid },
    Delta { session_id: Uuid, text: String },
    Response { session_id: Uuid, content: String },
    /// Empty input; nothing was recorded.
    Ignored { session_id: Uuid },
    /// Input refused before reaching the session.
    Notice { session_id: Uuid, content: String },
    Error {
        session_id: Uuid,
        kind: ErrorKind,
        content: String,
    },
}

/// Routes inbound WebSocket messages through the chat runner and fans the
/// resulting events out to the session's connections.
pub struct MessageRouter {
    runner: Arc<ChatRunner>,
    sessions: Arc<SessionRegistry>,
    connections: Arc<ConnectionManager>,
    sanitizer: Sanitizer,
}

impl MessageRouter {
    pub fn new(
        runner: Arc<ChatRunner>,
        sessions: Arc<SessionRegistry>,
        connections: Arc<ConnectionManager>,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            runner,
            sessions,
            connections,
            sanitizer,
        }
    }

    pub async fn handle_message(&self, session_id: Uuid, raw: &str) -> MindfulResult<()> {
        // Accept {"content": "..."} or plain text
        let content = match serde_json::from_str::<InboundMessage>(raw) {
            Ok(inbound) => inbound.content,
            Err(_) => raw.to_string(),
        };

        let content = match self.sanitizer.sanitize(&content).into_result() {
            Ok(clean) => clean,
            Err(reason) => {
                warn!(session_id = %session_id, "Rejected message: {reason}");
                return self
                    .send(
                        session_id,
                        &OutboundMessage::Notice {
                            session_id,
                            content: reason,
                        },
                    )
                    .await;
            }
        };

        let Some(handle) = self.sessions.get(session_id).await else {
            let err = MindfulError::Session("Session expired. Reload the page.".to_string());
            return self.send_error(session_id, &err).await;
        };
        let mut session = handle.lock().await;

        if !content.trim().is_empty() {
            // A missing key is reported without a thinking phase.
            if let Err(e) = self.runner.client().ensure_credential() {
                return self.send_error(session_id, &e).await;
            }
            self.send(session_id, &OutboundMessage::Thinking { session_id })
                .await?;
        }

        info!(session_id = %session_id, "Routing message to runner");

        let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);
        let runner = &self.runner;
        let submit = async move {
            let result = runner.submit_streaming(&mut session, &content, &tx).await;
            drop(tx);
            result
        };
        let forward = async {
            while let Some(event) = rx.recv().await {
                if let StreamEvent::TextDelta { text } = event {
                    let _ = self
                        .send(session_id, &OutboundMessage::Delta { session_id, text })
                        .await;
                }
            }
        };
        let (result, ()) = tokio::join!(submit, forward);

        match result {
            Ok(Exchange::Replied(content)) => {
                self.send(session_id, &OutboundMessage::Response { session_id, content })
                    .await
            }
            Ok(Exchange::Ignored) => {
                self.send(session_id, &OutboundMessage::Ignored { session_id })
                    .await
            }
            Err(e) => self.send_error(session_id, &e).await,
        }
    }

    async fn send_error(&self, session_id: Uuid, err: &MindfulError) -> MindfulResult<()> {
        let outbound = OutboundMessage::Error {
            session_id,
            kind: err.kind(),
            content: err.to_string(),
        };
        self.send(session_id, &outbound).await
    }

    async fn send(&self, session_id: Uuid, outbound: &OutboundMessage) -> MindfulResult<()> {
        let json = serde_json::to_string(outbound)?;
        self.connections.send_to_session(session_id, &json).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_serialization() {
        let session_id = Uuid::new_v4();
        let json = serde_json::to_value(OutboundMessage::Delta {
            session_id,
            text: "Breathe".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "delta");
        assert_eq!(json["text"], "Breathe");

        let json = serde_json::to_value(OutboundMessage::Error {
            session_id,
            kind: ErrorKind::Transport,
            content: "Transport error: boom".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "transport");
    }

    #[test]
    fn test_inbound_parses_json() {
        let inbound: InboundMessage = serde_json::from_str(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(inbound.content, "hi");
    }
}
