//! Saka3D - Headless procedural avatar animation service
//!
//! Drives a chat companion's VRM-style avatar:
//! - Static resting pose, blinking, idle breathing
//! - Smile while the user composes a message
//! - Mouth movement while the AI reply is spoken
//! - Chat bridge to an OpenAI-compatible completion endpoint
//! - Frame reports over HTTP/SSE for a browser renderer

pub mod animation;
pub mod avatar;
pub mod chat;
pub mod config;
pub mod error;
pub mod output;
pub mod web;

pub use config::Config;
pub use error::{Result, Saka3dError};

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};

use animation::FrameReport;
use avatar::{ChatInput, FrameInput, SpeechFlags};
use chat::{ChatClient, ChatEvents, ChatMessage};
use error::ChatError;

/// Application state shared across all components
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Chat input field state
    input_tx: watch::Sender<ChatInput>,
    /// TTS / AI talking flags
    speech_tx: watch::Sender<SpeechFlags>,
    /// Most recent frame
    frame: RwLock<FrameReport>,
    /// Channel for frame updates
    frame_tx: broadcast::Sender<FrameReport>,
    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Chat requests in flight
    chat_in_flight: AtomicUsize,
    chat: ChatClient,
    /// Bumped on every reply so a stale speech timer cannot end a newer one
    speech_epoch: AtomicU64,
}

impl AppState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let (frame_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (input_tx, _) = watch::channel(ChatInput::default());
        let (speech_tx, _) = watch::channel(SpeechFlags::default());

        let chat = ChatClient::new(&config.chat)?;

        Ok(Arc::new(Self {
            config: RwLock::new(config),
            input_tx,
            speech_tx,
            frame: RwLock::new(FrameReport::default()),
            frame_tx,
            shutdown_tx,
            chat_in_flight: AtomicUsize::new(0),
            chat,
            speech_epoch: AtomicU64::new(0),
        }))
    }

    /// Apply a change to the chat input state
    pub fn update_input(&self, f: impl FnOnce(&mut ChatInput)) {
        self.input_tx.send_modify(f);
    }

    pub fn chat_input(&self) -> ChatInput {
        self.input_tx.borrow().clone()
    }

    pub fn speech(&self) -> SpeechFlags {
        *self.speech_tx.borrow()
    }

    /// Set the external text-to-speech flag
    pub fn set_tts_speaking(&self, speaking: bool) {
        self.speech_tx.send_modify(|s| s.tts_speaking = speaking);
    }

    fn set_ai_talking(&self, talking: bool) {
        self.speech_tx.send_modify(|s| s.ai_talking = talking);
    }

    /// Signals the animator reads this frame
    pub fn frame_input(&self) -> FrameInput {
        FrameInput::new(&self.input_tx.borrow(), &self.speech_tx.borrow())
    }

    /// Store the latest frame and broadcast it
    pub async fn publish_frame(&self, report: FrameReport) {
        *self.frame.write().await = report;
        let _ = self.frame_tx.send(report);
    }

    /// Get the most recent frame
    pub async fn latest_frame(&self) -> FrameReport {
        *self.frame.read().await
    }

    /// Subscribe to frame updates
    pub fn subscribe_frames(&self) -> broadcast::Receiver<FrameReport> {
        self.frame_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// True while at least one chat request is in flight
    pub fn is_chat_loading(&self) -> bool {
        self.chat_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Hold the AI-talking flag for `duration`, replacing any running timer
    pub fn begin_speech(self: &Arc<Self>, duration: Duration) {
        let epoch = self.speech_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_ai_talking(true);
        tracing::debug!("AI talking for {:?}", duration);

        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if state.speech_epoch.load(Ordering::SeqCst) == epoch {
                state.set_ai_talking(false);
            }
        });
    }

    /// Cut the current AI speech short
    pub fn stop_speech(&self) {
        self.speech_epoch.fetch_add(1, Ordering::SeqCst);
        self.set_ai_talking(false);
    }

    /// Send a conversation to the chat endpoint.
    ///
    /// Tracks the loading flag while the request runs and, on success, makes
    /// the avatar talk for a time proportional to the reply length.
    pub async fn send_chat(
        self: &Arc<Self>,
        history: &[ChatMessage],
    ) -> std::result::Result<String, ChatError> {
        let chat_config = self.config.read().await.chat.clone();
        let mut events = ServiceChatEvents {
            state: self,
            config: &chat_config,
            outcome: None,
        };

        self.chat.submit(history, &mut events).await;

        events.outcome.unwrap_or(Err(ChatError::EmptyReply))
    }
}

/// Routes chat callbacks into the shared state
struct ServiceChatEvents<'a> {
    state: &'a Arc<AppState>,
    config: &'a config::ChatConfig,
    outcome: Option<std::result::Result<String, ChatError>>,
}

impl ChatEvents for ServiceChatEvents<'_> {
    fn on_loading_start(&mut self) {
        self.state.chat_in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn on_loading_end(&mut self) {
        self.state.chat_in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn on_reply(&mut self, reply: &str) {
        tracing::info!("Chat reply received ({} chars)", reply.chars().count());
        self.state
            .begin_speech(chat::speech_duration(reply, self.config));
        self.outcome = Some(Ok(reply.to_string()));
    }

    fn on_error(&mut self, error: &ChatError) {
        self.outcome = Some(Err(error.clone()));
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        AppState::new(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_input_drives_frame_input() {
        let state = state();
        state.update_input(|i| i.focus());
        state.update_input(|i| i.set_text("halo"));

        let input = state.frame_input();
        assert!(input.composing);
        assert!(input.user_typing);
        assert!(!input.ai_speaking);

        state.set_tts_speaking(true);
        assert!(state.frame_input().ai_speaking);
    }

    #[tokio::test]
    async fn test_publish_frame_broadcasts() {
        let state = state();
        let mut rx = state.subscribe_frames();

        let report = FrameReport {
            mouth: 0.3,
            ..Default::default()
        };
        state.publish_frame(report).await;

        assert_eq!(rx.recv().await.unwrap(), report);
        assert_eq!(state.latest_frame().await, report);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_timer_ends_talking() {
        let state = state();
        state.begin_speech(Duration::from_millis(800));
        assert!(state.speech().ai_talking);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(!state.speech().ai_talking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_speech_outlives_older_timer() {
        let state = state();
        state.begin_speech(Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(300)).await;
        state.begin_speech(Duration::from_millis(1000));

        // First timer fires here but must not end the second reply
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(state.speech().ai_talking);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!state.speech().ai_talking);
    }

    #[tokio::test]
    async fn test_stop_speech() {
        let state = state();
        state.begin_speech(Duration::from_secs(10));
        state.stop_speech();
        assert!(!state.speech().ai_talking);
    }

    /// Completion endpoint that answers `"slow"` after 600 ms and anything
    /// else after 100 ms
    async fn delayed_endpoint() -> String {
        use axum::{routing::post, Json, Router};
        use serde_json::{json, Value};

        async fn completions(Json(body): Json<Value>) -> Json<Value> {
            let delay = if body["messages"][0]["content"] == "slow" {
                600
            } else {
                100
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Json(json!({"choices": [{"message": {"content": "ok"}}]}))
        }

        let app = Router::new().route("/v1/chat/completions", post(completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/v1", addr)
    }

    fn state_for(base_url: String) -> Arc<AppState> {
        let mut config = Config::default();
        config.chat.base_url = base_url;
        config.chat.api_key = Some("test-token".to_string());
        config.chat.timeout_secs = Some(5);
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_chat_loading_while_request_runs() {
        let state = state_for(delayed_endpoint().await);
        assert!(!state.is_chat_loading());

        let chat_state = Arc::clone(&state);
        let request =
            tokio::spawn(async move { chat_state.send_chat(&[ChatMessage::user("slow")]).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(state.is_chat_loading());

        assert_eq!(request.await.unwrap().unwrap(), "ok");
        assert!(!state.is_chat_loading());
        assert!(state.speech().ai_talking);
    }

    #[tokio::test]
    async fn test_overlapping_chats_keep_loading() {
        let state = state_for(delayed_endpoint().await);

        let slow_state = Arc::clone(&state);
        let slow =
            tokio::spawn(async move { slow_state.send_chat(&[ChatMessage::user("slow")]).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            state.send_chat(&[ChatMessage::user("fast")]).await.unwrap(),
            "ok"
        );
        assert!(!slow.is_finished());
        assert!(state.is_chat_loading());

        slow.await.unwrap().unwrap();
        assert!(!state.is_chat_loading());
    }
}
