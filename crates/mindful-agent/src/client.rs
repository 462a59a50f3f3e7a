use crate::backends::openai::OpenAiBackend;
use crate::backends::CompletionBackend;
use crate::config::ModelConfig;
use crate::stream::StreamEvent;
use mindful_core::{MindfulError, MindfulResult, Turn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stateless request/response wrapper around a remote completion endpoint.
///
/// The preamble is fixed at construction. Each call checks its input and the
/// credential before making exactly one outbound request through the backend.
pub struct CompletionClient {
    backend: Box<dyn CompletionBackend>,
    preamble: String,
}

impl CompletionClient {
    pub fn new(config: ModelConfig) -> Self {
        let preamble = config.preamble().to_string();
        Self {
            backend: Box::new(OpenAiBackend::new(config)),
            preamble,
        }
    }

    /// Create from a pre-built backend.
    pub fn from_backend(backend: Box<dyn CompletionBackend>, preamble: impl Into<String>) -> Self {
        Self {
            backend,
            preamble: preamble.into(),
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Checks the credential without touching the network.
    pub fn ensure_credential(&self) -> MindfulResult<()> {
        self.backend.ensure_credential()
    }

    /// Sends the preamble, `history` and `new_user_text`; returns the reply.
    pub async fn complete(&self, history: &[Turn], new_user_text: &str) -> MindfulResult<String> {
        self.check(new_user_text)?;
        self.backend
            .complete(&self.preamble, history, new_user_text)
            .await
    }

    /// Streaming variant of [`complete`](Self::complete).
    pub async fn complete_stream(
        &self,
        history: &[Turn],
        new_user_text: &str,
    ) -> MindfulResult<(mpsc::Receiver<StreamEvent>, JoinHandle<MindfulResult<String>>)> {
        self.check(new_user_text)?;
        self.backend
            .complete_stream(&self.preamble, history, new_user_text)
            .await
    }

    fn check(&self, new_user_text: &str) -> MindfulResult<()> {
        if new_user_text.trim().is_empty() {
            return Err(MindfulError::InvalidInput(
                "user message must not be empty".to_string(),
            ));
        }
        self.ensure_credential()
    }
}
