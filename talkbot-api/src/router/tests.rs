#[cfg(test)]
mod tests {
    use crate::app::{create_app, AppState};
    use async_trait::async_trait;
    use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use talkbot_core::client::{ChatBackend, ChatRole, ClientError, ModelMessage};
    use talkbot_core::config::model::{BackendKind, Config};
    use talkbot_core::prompt::build_vision_prompt;
    use talkbot_core::CredentialSet;

    const KEY: &str = "test-key-0123456789abcdef";

    /// 模拟后端的回复
    #[derive(Debug, Clone)]
    enum Reply {
        Text(&'static str),
        Empty,
        Timeout,
        Refused,
    }

    /// 记录每次调用的模拟后端
    struct MockBackend {
        default_reply: Reply,
        per_model: HashMap<String, Reply>,
        calls: Mutex<Vec<(String, Vec<ModelMessage>)>>,
    }

    impl MockBackend {
        fn new(default_reply: Reply) -> Self {
            Self {
                default_reply,
                per_model: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_model_reply(mut self, model: &str, reply: Reply) -> Self {
            self.per_model.insert(model.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<(String, Vec<ModelMessage>)> {
            self.calls.lock().unwrap().clone()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatBackend for MockBackend {
        fn backend_type(&self) -> BackendKind {
            BackendKind::Ollama
        }

        fn base_url(&self) -> &str {
            "http://mock"
        }

        async fn chat(
            &self,
            model: &str,
            messages: &[ModelMessage],
            _timeout: Duration,
        ) -> Result<String, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));

            let reply = self
                .per_model
                .get(model)
                .cloned()
                .unwrap_or_else(|| self.default_reply.clone());
            match reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Empty => Err(ClientError::EmptyResponse),
                Reply::Timeout => Err(ClientError::Unreachable {
                    reason: "operation timed out".to_string(),
                    timed_out: true,
                }),
                Reply::Refused => Err(ClientError::Unreachable {
                    reason: "connection refused".to_string(),
                    timed_out: false,
                }),
            }
        }

        async fn models(&self, _timeout: Duration) -> Result<Vec<String>, ClientError> {
            Ok(vec!["llama3.1:8b".to_string(), "llava:7b".to_string()])
        }
    }

    fn create_server(config: Config, backend: Arc<MockBackend>) -> TestServer {
        let credentials = CredentialSet::from_tokens([KEY.to_string(), "second-key".to_string()]);
        let state = AppState::from_parts(config, credentials, backend);
        TestServer::new(create_app(state)).unwrap()
    }

    fn jpeg_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    fn image_part(data: Vec<u8>) -> Part {
        Part::bytes(data)
            .file_name("frame.jpg")
            .mime_type("image/jpeg")
    }

    #[tokio::test]
    async fn test_health_requires_no_auth() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "talkbot-gateway");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_index() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend);

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("TalkBot Gateway"));
    }

    #[tokio::test]
    async fn test_auth_debug_reports_token_length() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend);

        let response = server.get("/_authdebug").authorization_bearer(KEY).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["token_len"], KEY.len());
        assert_eq!(body["loaded_keys"], 2);
        assert!(!response.text().contains(KEY));
    }

    #[tokio::test]
    async fn test_empty_credential_set_rejects_auth_debug() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let state = AppState::from_parts(Config::default(), CredentialSet::default(), backend.clone());
        let server = TestServer::new(create_app(state)).unwrap();

        let response = server.get("/_authdebug").authorization_bearer(KEY).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "invalid_token");
        assert_eq!(body["error"]["code"], 403);

        // 缺少头仍然是 401
        let response = server.get("/_authdebug").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_success() {
        let backend = Arc::new(MockBackend::new(Reply::Text("Hi! How can I help?")));
        let server = create_server(Config::default(), backend.clone());

        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "  hello  ", "voice_id": "af_bella"}))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["text"], "Hi! How can I help?");

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llama3.1:8b");
        assert_eq!(calls[0].1, vec![ModelMessage::user("hello")]);
    }

    #[tokio::test]
    async fn test_chat_uses_system_prompt() {
        let mut config = Config::default();
        config.chat.system_prompt = Some("Answer in one sentence.".to_string());
        let backend = Arc::new(MockBackend::new(Reply::Text("ok")));
        let server = create_server(config, backend.clone());

        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let calls = backend.calls();
        assert_eq!(calls[0].1.len(), 2);
        assert_eq!(calls[0].1[0].role, ChatRole::System);
        assert_eq!(calls[0].1[0].content, "Answer in one sentence.");
    }

    #[tokio::test]
    async fn test_chat_empty_text_is_bad_input() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        for payload in [json!({"text": "   "}), json!({}), json!({"text": null})] {
            let response = server
                .post("/chat")
                .authorization_bearer(KEY)
                .json(&payload)
                .await;
            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["error"]["type"], "bad_input");
            assert_eq!(body["error"]["code"], 400);
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_non_json_body_is_bad_input() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .text("not json")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "bad_input");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_rejects_unauthenticated_without_backend_call() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let response = server.post("/chat").json(&json!({"text": "hi"})).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "missing_authorization");

        let response = server
            .post("/chat")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Token abc"))
            .json(&json!({"text": "hi"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .post("/chat")
            .authorization_bearer("wrong-key")
            .json(&json!({"text": "hi"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "invalid_token");

        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_empty_backend_reply_is_error() {
        let backend = Arc::new(MockBackend::new(Reply::Empty));
        let server = create_server(Config::default(), backend);

        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "backend_empty_response");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("different model"));
    }

    #[tokio::test]
    async fn test_chat_backend_timeout_and_refused() {
        let backend = Arc::new(MockBackend::new(Reply::Timeout));
        let server = create_server(Config::default(), backend);
        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "backend_unreachable");

        let backend = Arc::new(MockBackend::new(Reply::Refused));
        let server = create_server(Config::default(), backend);
        let response = server
            .post("/chat")
            .authorization_bearer(KEY)
            .json(&json!({"text": "hello"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "backend_unreachable");
        assert!(!response.text().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_vision_success_uses_mode_prompt() {
        let backend = Arc::new(MockBackend::new(Reply::Text("A person holding a cup.")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new()
            .add_text("mode", "navigate")
            .add_text("target", "the door")
            .add_text("voice_id", "af_bella")
            .add_part("image", image_part(jpeg_bytes()));

        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["text"], "A person holding a cup.");

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llava:7b");
        let messages = &calls[0].1;
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("the door"));
        assert_eq!(messages[1].content, "Analyze this image.");
        let image = messages[1].image.as_ref().unwrap();
        assert_eq!(image.mime, "image/jpeg");
    }

    #[tokio::test]
    async fn test_vision_unknown_mode_uses_scene_instruction() {
        let backend = Arc::new(MockBackend::new(Reply::Text("A hallway.")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new()
            .add_text("mode", "selfie")
            .add_part("image", image_part(jpeg_bytes()));
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let calls = backend.calls();
        assert_eq!(calls[0].1[0].content, build_vision_prompt(Some("scene"), None));
    }

    #[tokio::test]
    async fn test_vision_prompt_field_becomes_user_text() {
        let backend = Arc::new(MockBackend::new(Reply::Text("Two mugs.")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new()
            .add_text("mode", "objects")
            .add_text("prompt", "How many mugs are there?")
            .add_part("image", image_part(jpeg_bytes()));

        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let calls = backend.calls();
        assert_eq!(calls[0].1[1].content, "How many mugs are there?");
    }

    #[tokio::test]
    async fn test_vision_empty_reply_returns_fallback_text() {
        let backend = Arc::new(MockBackend::new(Reply::Empty));
        let config = Config::default();
        let expected = config.vision.empty_response_text.clone();
        let server = create_server(config, backend.clone());

        let form = MultipartForm::new()
            .add_text("mode", "objects")
            .add_part("image", image_part(jpeg_bytes()));

        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["text"], expected.as_str());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_vision_retries_fallback_model_on_empty_reply() {
        let mut config = Config::default();
        config.backend.vision_fallback_model = Some("moondream".to_string());
        let backend = Arc::new(
            MockBackend::new(Reply::Empty).with_model_reply("moondream", Reply::Text("A kitchen.")),
        );
        let server = create_server(config, backend.clone());

        let form = MultipartForm::new().add_part("image", image_part(jpeg_bytes()));
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["text"], "A kitchen.");

        let models: Vec<String> = backend.calls().into_iter().map(|(model, _)| model).collect();
        assert_eq!(models, vec!["llava:7b".to_string(), "moondream".to_string()]);
    }

    #[tokio::test]
    async fn test_vision_does_not_retry_on_backend_error() {
        let mut config = Config::default();
        config.backend.vision_fallback_model = Some("moondream".to_string());
        let backend = Arc::new(MockBackend::new(Reply::Timeout));
        let server = create_server(config, backend.clone());

        let form = MultipartForm::new().add_part("image", image_part(jpeg_bytes()));
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_vision_missing_image_is_bad_input() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new().add_text("mode", "scene");
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "bad_input");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_vision_undecodable_image_is_bad_input() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new()
            .add_part("image", image_part(b"definitely not an image".to_vec()));
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "bad_input");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_vision_oversized_image_is_rejected() {
        let mut config = Config::default();
        config.vision.max_image_bytes = 64;
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(config, backend.clone());

        let form = MultipartForm::new().add_part("image", image_part(vec![0xFF; 1024]));
        let response = server
            .post("/vision")
            .authorization_bearer(KEY)
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert_eq!(body["error"]["type"], "payload_too_large");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_vision_rejects_unauthenticated_without_backend_call() {
        let backend = Arc::new(MockBackend::new(Reply::Text("unused")));
        let server = create_server(Config::default(), backend.clone());

        let form = MultipartForm::new().add_part("image", image_part(jpeg_bytes()));
        let response = server.post("/vision").multipart(form).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let form = MultipartForm::new().add_part("image", image_part(jpeg_bytes()));
        let response = server
            .post("/vision")
            .authorization_bearer("wrong-key")
            .multipart(form)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        assert_eq!(backend.call_count(), 0);
    }
}
