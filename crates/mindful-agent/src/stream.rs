use serde::{Deserialize, Serialize};

/// Events emitted while a completion is streamed from the provider.
///
/// Consumers (the WebSocket handler) use these to display the reply as it is
/// generated. The final reply text is delivered separately, once the stream
/// has completed successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of reply text.
    TextDelta { text: String },

    /// The provider signalled the end of the reply.
    Done,

    /// The stream broke off; the partial reply must be discarded.
    Error { message: String },
}
