//! Completion client and chat runner for Mindful.
//!
//! [`CompletionClient`] wraps a remote chat-completion endpoint behind a fixed
//! preamble; [`ChatRunner`] drives one user submission through a [`Session`].
//!
//! [`Session`]: mindful_session::Session

/// Provider backends.
pub mod backends;
/// Completion client.
pub mod client;
/// Model and provider configuration.
pub mod config;
/// Default system preamble.
pub mod preamble;
/// Per-submission control flow.
pub mod runner;
/// Streaming events.
pub mod stream;

pub use client::CompletionClient;
pub use config::{LlmProvider, ModelConfig};
pub use preamble::WELLNESS_PREAMBLE;
pub use runner::{ChatRunner, Exchange};
pub use stream::StreamEvent;
