pub mod openai;

use crate::stream::StreamEvent;
use async_trait::async_trait;
use mindful_core::{MindfulResult, Turn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Trait for completion provider backends.
///
/// A backend turns a preamble, the prior turns and the new user text into one
/// reply. Every call makes at most one outbound request and never retries.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Fails with a configuration error when the backend cannot authenticate.
    /// Must not touch the network.
    fn ensure_credential(&self) -> MindfulResult<()> {
        Ok(())
    }

    /// Non-streaming completion.
    async fn complete(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
    ) -> MindfulResult<String>;

    /// Streaming completion.
    ///
    /// Returns a receiver for stream events and a join handle that resolves
    /// to the full reply text.
    async fn complete_stream(
        &self,
        preamble: &str,
        history: &[Turn],
        user_text: &str,
    ) -> MindfulResult<(mpsc::Receiver<StreamEvent>, JoinHandle<MindfulResult<String>>)>;
}
