//! REST API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::avatar::ExpressionCategory;
use crate::chat::ChatMessage;
use crate::output::sse;
use crate::AppState;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        })
    }

    pub fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            error: None,
        })
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub mode: String,
    pub focused: bool,
    pub composing: bool,
    pub user_typing: bool,
    pub ai_speaking: bool,
    pub tts_speaking: bool,
    pub ai_talking: bool,
    pub chat_loading: bool,
    pub fps: u32,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let input = state.frame_input();
    let focused = state.chat_input().is_focused();
    let speech = state.speech();
    let fps = state.config.read().await.render.fps;

    ApiResponse::success(StatusResponse {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        mode: input.talk_mode().to_string(),
        focused,
        composing: input.composing,
        user_typing: input.user_typing,
        ai_speaking: input.ai_speaking,
        tts_speaking: speech.tts_speaking,
        ai_talking: speech.ai_talking,
        chat_loading: state.is_chat_loading(),
        fps,
    })
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(config.clone())
}

/// Get the most recent frame
pub async fn get_frame(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ApiResponse::success(state.latest_frame().await)
}

/// Chat input gained focus
pub async fn focus_input(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.update_input(|input| input.focus());
    ApiResponse::<()>::ok()
}

/// Chat input lost focus
pub async fn blur_input(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.update_input(|input| input.blur());
    ApiResponse::<()>::ok()
}

/// Input event request
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

pub async fn set_input(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InputRequest>,
) -> impl IntoResponse {
    state.update_input(|input| input.set_text(request.text));
    ApiResponse::<()>::ok()
}

/// Speech flags request
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub tts_speaking: Option<bool>,
    /// Only `false` is accepted; it cuts the current reply short
    #[serde(default)]
    pub ai_talking: Option<bool>,
}

/// AI talking starts only from a chat reply, so `ai_talking: true` is rejected
pub async fn set_speech(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeechRequest>,
) -> Response {
    if request.ai_talking == Some(true) {
        return (
            StatusCode::BAD_REQUEST,
            ApiResponse::error("ai_talking can only be set to false"),
        )
            .into_response();
    }
    if let Some(speaking) = request.tts_speaking {
        state.set_tts_speaking(speaking);
    }
    if request.ai_talking == Some(false) {
        state.stop_speech();
    }
    ApiResponse::<()>::ok().into_response()
}

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Forward a conversation to the chat endpoint.
///
/// The chat input is cleared on submit, as the UI does after sending.
pub async fn send_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            ApiResponse::error("messages must not be empty"),
        )
            .into_response();
    }

    state.update_input(|input| input.clear());

    match state.send_chat(&request.messages).await {
        Ok(reply) => ApiResponse::success(ChatReply { reply }).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, ApiResponse::error(&e.to_string())).into_response(),
    }
}

/// Candidate morph target names per expression category
pub async fn list_expressions() -> impl IntoResponse {
    let tables: BTreeMap<&str, &[&str]> = ExpressionCategory::ALL
        .iter()
        .map(|c| (c.as_str(), c.candidates()))
        .collect();
    ApiResponse::success(tables)
}

/// SSE stream endpoint
pub async fn frame_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_frame_stream(state)
}
