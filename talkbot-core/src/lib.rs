//! TalkBot Core Library
//!
//! This library provides core functionality for the TalkBot Gateway including:
//! - Configuration management
//! - Bearer token authentication
//! - Vision prompt construction
//! - Inference backend clients

pub mod auth;
pub mod client;
pub mod config;
pub mod prompt;

// Re-export commonly used types
pub use auth::{AuthError, AuthMiddleware, AuthenticatedKey, Authenticator, CredentialSet};
pub use client::{ChatBackend, ClientError, ClientFactory, ModelMessage, UnifiedClient};
pub use config::model::{BackendKind, BackendSettings, Config};
pub use prompt::{build_vision_prompt, VisionMode};
