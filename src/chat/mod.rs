//! Chat bridge to a hosted language model
//!
//! Forwards a conversation history to `POST {base_url}/chat/completions` and
//! hands the reply back through [`ChatEvents`] callbacks.

pub mod client;
pub mod types;

use std::time::Duration;

use crate::config::ChatConfig;

pub use client::{ChatClient, ChatEvents};
pub use types::{ChatMessage, Role};

/// How long the avatar should keep talking for `reply`
pub fn speech_duration(reply: &str, config: &ChatConfig) -> Duration {
    let chars = reply.chars().count() as u64;
    let ms = chars
        .saturating_mul(config.speech_ms_per_char)
        .clamp(config.speech_min_ms, config.speech_max_ms.max(config.speech_min_ms));
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_duration_is_clamped() {
        let config = ChatConfig::default();

        assert_eq!(speech_duration("", &config), Duration::from_millis(800));
        assert_eq!(speech_duration("hai", &config), Duration::from_millis(800));
        assert_eq!(
            speech_duration(&"a".repeat(100), &config),
            Duration::from_millis(6_000)
        );
        assert_eq!(
            speech_duration(&"a".repeat(10_000), &config),
            Duration::from_millis(15_000)
        );
    }

    #[test]
    fn test_speech_duration_counts_chars_not_bytes() {
        let config = ChatConfig::default();
        // 20 three-byte characters
        let reply = "笑".repeat(20);
        assert_eq!(speech_duration(&reply, &config), Duration::from_millis(1_200));
    }
}
