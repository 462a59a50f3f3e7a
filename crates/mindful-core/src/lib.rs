//! Core types and error definitions for Mindful.
//!
//! This crate provides the foundational types shared across all Mindful crates:
//! the error taxonomy surfaced to users and the conversation turn.
//!
//! # Main types
//!
//! - [`MindfulError`]: Unified error enum for all Mindful subsystems.
//! - [`MindfulResult`]: Convenience alias for `Result<T, MindfulError>`.
//! - [`ErrorKind`]: The user-facing classification of a [`MindfulError`].
//! - [`Role`]: Turn author (user or assistant).
//! - [`Turn`]: A single immutable message within a conversation session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Error types ---

/// Top-level error type for Mindful.
#[derive(Debug, thiserror::Error)]
pub enum MindfulError {
    /// Missing or invalid configuration, most notably the provider credential.
    #[error("Config error: {0}")]
    Config(String),

    /// The remote completion endpoint could not be reached or refused the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller passed input the operation cannot accept.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error related to session lookup.
    #[error("Session error: {0}")]
    Session(String),

    /// An error from the HTTP gateway layer.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MindfulError {
    /// Classifies the error into the kinds the UI distinguishes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MindfulError::Config(_) => ErrorKind::Configuration,
            MindfulError::Transport(_) => ErrorKind::Transport,
            _ => ErrorKind::Internal,
        }
    }
}

/// A convenience `Result` alias using [`MindfulError`].
pub type MindfulResult<T> = Result<T, MindfulError>;

/// How an error is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Blocking: nothing works until the configuration is fixed externally.
    Configuration,
    /// Inline: shown in place of the assistant reply, the user may retry.
    Transport,
    /// Anything else; a bug or an I/O failure on our side.
    Internal,
}

// --- Turn types ---

/// The participant that authored a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human end-user.
    User,
    /// The model's reply.
    Assistant,
}

impl Role {
    /// Lowercase name, as used on the wire and in CSS classes.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    /// Creates a new turn with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a new turn with [`Role::User`].
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new turn with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The author of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The text of this turn.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// UTC timestamp of when the turn was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
