//! External signals that steer the facial animation

use serde::{Deserialize, Serialize};

/// Which branch of the mouth animation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TalkMode {
    /// User is typing, mouth held shut
    Typing,
    /// Nobody is speaking, mouth relaxes
    Idle,
    /// AI reply is being spoken, mouth moves
    Speaking,
}

impl Default for TalkMode {
    fn default() -> Self {
        Self::Idle
    }
}

impl TalkMode {
    /// Pick the mode for this frame. Typing wins over speaking.
    pub fn select(user_typing: bool, ai_speaking: bool) -> Self {
        if user_typing {
            TalkMode::Typing
        } else if ai_speaking {
            TalkMode::Speaking
        } else {
            TalkMode::Idle
        }
    }
}

impl std::fmt::Display for TalkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TalkMode::Typing => write!(f, "typing"),
            TalkMode::Idle => write!(f, "idle"),
            TalkMode::Speaking => write!(f, "speaking"),
        }
    }
}

/// State of the chat text input, fed by UI focus/blur/input events.
///
/// Two derived signals matter: [`is_composing`](Self::is_composing) (focused
/// with text, drives the smile) and [`user_typing`](Self::user_typing) (set on
/// focus, then tracks whether text is present, silences the mouth).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInput {
    focused: bool,
    text: String,
    user_typing: bool,
}

impl ChatInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input gained focus
    pub fn focus(&mut self) {
        self.focused = true;
        self.user_typing = true;
    }

    /// Input lost focus
    pub fn blur(&mut self) {
        self.focused = false;
        self.user_typing = self.has_text();
    }

    /// Input content changed
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.user_typing = self.has_text();
    }

    /// Message submitted, input cleared
    pub fn clear(&mut self) {
        self.set_text(String::new());
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Focused and holding non-blank text
    pub fn is_composing(&self) -> bool {
        self.focused && self.has_text()
    }

    pub fn user_typing(&self) -> bool {
        self.user_typing
    }
}

/// Speech activity reported by the UI host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechFlags {
    /// Text-to-speech audio is playing
    pub tts_speaking: bool,
    /// A chat reply is being presented as speech
    pub ai_talking: bool,
}

impl SpeechFlags {
    pub fn is_active(&self) -> bool {
        self.tts_speaking || self.ai_talking
    }

    pub fn with_tts(mut self, speaking: bool) -> Self {
        self.tts_speaking = speaking;
        self
    }

    pub fn with_ai_talking(mut self, talking: bool) -> Self {
        self.ai_talking = talking;
        self
    }
}

/// Everything the animator reads from the outside world in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameInput {
    /// Input focused with text: smile
    pub composing: bool,
    /// Typing flag: mouth stays shut
    pub user_typing: bool,
    /// AI speech active: mouth moves
    pub ai_speaking: bool,
}

impl FrameInput {
    pub fn new(input: &ChatInput, speech: &SpeechFlags) -> Self {
        Self {
            composing: input.is_composing(),
            user_typing: input.user_typing(),
            ai_speaking: speech.is_active(),
        }
    }

    pub fn talk_mode(&self) -> TalkMode {
        TalkMode::select(self.user_typing, self.ai_speaking)
    }
}
