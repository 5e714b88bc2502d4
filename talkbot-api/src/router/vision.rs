use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use talkbot_core::client::ClientError;
use talkbot_core::prompt::{build_vision_prompt, mode_names, VisionMode};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct VisionResponse {
    pub text: String,
}

/// multipart 表单中识别的字段
#[derive(Debug, Default)]
struct VisionForm {
    image: Option<Bytes>,
    mode: Option<String>,
    target: Option<String>,
    prompt: Option<String>,
}

/// 图片描述：根据模式选择系统指令，调用视觉模型
pub async fn vision(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<VisionResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_input(e.body_text()))?;
    let max_image_bytes = state.config.vision.max_image_bytes;
    let form = read_form(multipart, max_image_bytes).await?;

    let image = form
        .image
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ApiError::bad_input("Missing 'image' part"))?;
    ensure_decodable(image.clone()).await?;

    let mode = VisionMode::resolve(form.mode.as_deref());
    if let Some(requested) = form.mode.as_deref() {
        if VisionMode::lookup(requested).is_none() {
            debug!(
                "Unknown vision mode '{}', using '{}' (known: {})",
                requested,
                mode,
                mode_names().collect::<Vec<_>>().join(", ")
            );
        }
    }

    let instruction = build_vision_prompt(form.mode.as_deref(), form.target.as_deref());
    let user_text = form
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(state.config.vision.default_user_text.as_str());

    let text = describe(&state, &instruction, user_text, &image).await?;
    let text = match text {
        Some(text) => text,
        None => {
            info!("Vision returned no content for mode '{}', sending fallback text", mode);
            state.config.vision.empty_response_text.clone()
        }
    };

    Ok(Json(VisionResponse { text }))
}

/// 调用视觉模型；空回复时按配置尝试一次备用模型。
///
/// 两次都为空时返回 `Ok(None)`，空回复不算错误。
async fn describe(
    state: &AppState,
    instruction: &str,
    user_text: &str,
    image: &[u8],
) -> Result<Option<String>, ApiError> {
    let backend = &state.config.backend;
    let mut models = vec![backend.vision_model.as_str()];
    if let Some(fallback) = backend.effective_vision_fallback() {
        models.push(fallback);
    }

    for model in models {
        let start = Instant::now();
        match state
            .backend
            .chat_with_image(model, instruction, user_text, image, backend.vision_timeout())
            .await
        {
            Ok(text) => {
                info!(
                    "Vision completed with {} in {:?} ({} bytes image)",
                    model,
                    start.elapsed(),
                    image.len()
                );
                return Ok(Some(text));
            }
            Err(ClientError::EmptyResponse) => {
                warn!("Vision model {} returned an empty response", model);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(None)
}

async fn read_form(mut multipart: Multipart, max_image_bytes: usize) -> Result<VisionForm, ApiError> {
    let mut form = VisionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, max_image_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| map_multipart_error(e, max_image_bytes))?;
                if data.len() > max_image_bytes {
                    return Err(ApiError::PayloadTooLarge(max_image_bytes));
                }
                form.image = Some(data);
            }
            "mode" | "target" | "prompt" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| map_multipart_error(e, max_image_bytes))?;
                match name.as_str() {
                    "mode" => form.mode = Some(value),
                    "target" => form.target = Some(value),
                    _ => form.prompt = Some(value),
                }
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

fn map_multipart_error(error: MultipartError, max_image_bytes: usize) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(max_image_bytes)
    } else {
        ApiError::bad_input(error.body_text())
    }
}

/// 在阻塞线程池中完整解码一次，确认上传内容是图片
async fn ensure_decodable(data: Bytes) -> Result<(), ApiError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&data).map(|_| ()))
        .await
        .map_err(|e| ApiError::Internal(format!("Image decoding task join error: {}", e)))?
        .map_err(|e| {
            debug!("Rejecting undecodable image: {}", e);
            ApiError::bad_input("Uploaded 'image' is not a decodable image")
        })
}
