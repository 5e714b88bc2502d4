use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use talkbot_core::client::ModelMessage;
use tracing::{debug, info};

/// 聊天请求；客户端附带的其他字段（如 voice_id）会被忽略
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
}

/// 文本聊天
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_input(e.body_text()))?;

    let text = request.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::bad_input("Field 'text' must not be empty"));
    }

    let messages = build_chat_messages(state.config.chat.system_prompt.as_deref(), text);

    let backend = &state.config.backend;
    let start = Instant::now();
    debug!("Chat request: {} chars to {}", text.len(), backend.chat_model);

    let reply = state
        .backend
        .chat(&backend.chat_model, &messages, backend.chat_timeout())
        .await?;

    info!(
        "Chat completed with {} in {:?} ({} chars)",
        backend.chat_model,
        start.elapsed(),
        reply.len()
    );

    Ok(Json(ChatResponse { text: reply }))
}

fn build_chat_messages(system_prompt: Option<&str>, text: &str) -> Vec<ModelMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        messages.push(ModelMessage::system(system));
    }
    messages.push(ModelMessage::user(text));
    messages
}
