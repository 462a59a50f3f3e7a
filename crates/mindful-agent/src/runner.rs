use crate::client::CompletionClient;
use crate::config::ModelConfig;
use crate::stream::StreamEvent;
use mindful_core::{MindfulError, MindfulResult, Turn};
use mindful_session::Session;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outcome of one successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// The input was empty; nothing was recorded or sent.
    Ignored,
    /// The model replied; both turns were recorded.
    Replied(String),
}

/// Drives one user submission through a session.
/// Input check → user turn → completion → assistant turn.
///
/// On a transport failure the user turn stays recorded and no assistant turn
/// is added; the error is returned for the caller to surface.
pub struct ChatRunner {
    client: CompletionClient,
}

impl ChatRunner {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: CompletionClient::new(config),
        }
    }

    pub fn from_client(client: CompletionClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub async fn submit(&self, session: &mut Session, input: &str) -> MindfulResult<Exchange> {
        let Some(prior) = self.begin(session, input)? else {
            return Ok(Exchange::Ignored);
        };

        let result = self
            .client
            .complete(&session.all()[..prior], input.trim())
            .await;

        self.finish(session, result)
    }

    /// Same as [`submit`](Self::submit), forwarding stream events to `events`
    /// while the reply is generated.
    pub async fn submit_streaming(
        &self,
        session: &mut Session,
        input: &str,
        events: &mpsc::Sender<StreamEvent>,
    ) -> MindfulResult<Exchange> {
        let Some(prior) = self.begin(session, input)? else {
            return Ok(Exchange::Ignored);
        };

        let result = match self
            .client
            .complete_stream(&session.all()[..prior], input.trim())
            .await
        {
            Ok((mut rx, handle)) => {
                while let Some(event) = rx.recv().await {
                    // A closed receiver only means nobody is watching anymore.
                    let _ = events.send(event).await;
                }
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(MindfulError::Transport(format!(
                        "Completion task failed: {e}"
                    ))),
                }
            }
            Err(e) => Err(e),
        };

        self.finish(session, result)
    }

    /// Validates the submission and records the user turn. Returns the number
    /// of turns that precede it, or `None` when the input is empty.
    fn begin(&self, session: &mut Session, input: &str) -> MindfulResult<Option<usize>> {
        let text = input.trim();
        if text.is_empty() {
            debug!(session_id = %session.id, "Ignoring empty submission");
            return Ok(None);
        }

        self.client.ensure_credential()?;

        let prior = session.len();
        session.append(Turn::user(text));
        info!(session_id = %session.id, turns = session.len(), "Requesting completion");
        Ok(Some(prior))
    }

    fn finish(
        &self,
        session: &mut Session,
        result: MindfulResult<String>,
    ) -> MindfulResult<Exchange> {
        match result {
            Ok(reply) => {
                session.append(Turn::assistant(reply.as_str()));
                info!(session_id = %session.id, turns = session.len(), "Completion recorded");
                Ok(Exchange::Replied(reply))
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Completion failed");
                Err(e)
            }
        }
    }
}
