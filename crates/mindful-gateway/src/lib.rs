//! HTTP gateway for Mindful: the chat page, form submissions, the streaming
//! WebSocket and a JSON transcript endpoint, each scoped to the browser
//! session identified by the `mindful_session` cookie.

pub mod connection;
pub mod cookie;
pub mod page;
pub mod router;
pub mod sanitizer;
pub mod server;

pub use page::PRESET_PROMPTS;
pub use sanitizer::Sanitizer;
pub use server::{GatewayConfig, GatewayServer};
