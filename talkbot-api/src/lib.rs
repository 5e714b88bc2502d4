//! TalkBot Gateway Server Library
//!
//! Authenticated HTTP gateway exposing chat and vision on top of a local model backend

pub mod app;
pub mod error;
pub mod router;

// Re-export the main server function
pub use app::{create_app, start_server, AppState};
