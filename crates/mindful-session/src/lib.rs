//! Conversation sessions for Mindful.
//!
//! A [`Session`] is the ordered, append-only turn history of one user
//! interaction. The [`SessionRegistry`] keeps the live sessions of a running
//! server in memory; nothing is persisted across restarts.

/// In-memory registry of live sessions.
pub mod registry;
/// The session type.
pub mod session;

pub use registry::{SessionHandle, SessionRegistry};
pub use session::Session;
