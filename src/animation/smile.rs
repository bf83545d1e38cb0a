//! Smile while the user is composing a message

use serde::Serialize;

use crate::config::SmileConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SmileState {
    level: f32,
}

impl SmileState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ease the level toward the target for this frame and return it.
    ///
    /// Rises at `rise_rate` while composing, falls at `fall_rate` otherwise.
    pub fn step(&mut self, composing: bool, config: &SmileConfig) -> f32 {
        let (target, rate) = if composing {
            (config.target, config.rise_rate)
        } else {
            (0.0, config.fall_rate)
        };
        self.level = lerp(self.level, target, rate);
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

/// Joy-eye weight for a smile level, clamped to [0, 1]
pub fn joy_eye_level(smile: f32, config: &SmileConfig) -> f32 {
    (smile * config.joy_eye_gain).clamp(0.0, 1.0)
}

pub(crate) fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
