//! HTTP client for an OpenAI-compatible chat completion endpoint

use std::time::Duration;

use reqwest::Client;

use super::types::{ChatMessage, CompletionRequest, CompletionResponse};
use crate::config::ChatConfig;
use crate::error::ChatError;

/// Callbacks fired around one [`ChatClient::submit`].
///
/// `on_loading_start` and `on_loading_end` fire exactly once each, then
/// exactly one of `on_reply` or `on_error`.
pub trait ChatEvents {
    fn on_loading_start(&mut self) {}

    fn on_loading_end(&mut self) {}

    fn on_reply(&mut self, reply: &str);

    fn on_error(&mut self, error: &ChatError);
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: Option<String>,
    api_key_env: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!(
                "No chat API key configured (chat.api_key or ${}), chat requests will fail",
                config.api_key_env
            );
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `history` and return the trimmed reply of the first choice.
    pub async fn complete(&self, history: &[ChatMessage]) -> Result<String, ChatError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::MissingApiKey(self.api_key_env.clone()))?;

        let body = CompletionRequest {
            model: &self.model,
            messages: history,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            "Sending {} messages to {} ({})",
            history.len(),
            self.endpoint,
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let reply = completion.reply().ok_or(ChatError::EmptyReply)?;

        tracing::debug!("Received reply ({} chars)", reply.chars().count());
        Ok(reply.to_string())
    }

    /// Run one request and report its progress through `events`.
    ///
    /// Failures go to [`ChatEvents::on_error`]; nothing is returned.
    pub async fn submit<E>(&self, history: &[ChatMessage], events: &mut E)
    where
        E: ChatEvents + ?Sized,
    {
        events.on_loading_start();
        let result = self.complete(history).await;
        events.on_loading_end();

        match result {
            Ok(reply) => events.on_reply(&reply),
            Err(e) => {
                tracing::error!("Chat request failed: {}", e);
                events.on_error(&e);
            }
        }
    }
}
