//! Mouth viseme level driven by the talk state machine

use rand::Rng;
use serde::Serialize;

use super::smile::lerp;
use crate::avatar::TalkMode;
use crate::config::TalkConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TalkState {
    level: f32,
    phase: f32,
}

impl TalkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one frame in `mode` and return the mouth level.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        mode: TalkMode,
        dt: f32,
        config: &TalkConfig,
        rng: &mut R,
    ) -> f32 {
        match mode {
            TalkMode::Typing => {
                self.level = lerp(self.level, 0.0, config.typing_decay);
                self.phase = 0.0;
            }
            TalkMode::Idle => {
                self.level = lerp(self.level, 0.0, config.idle_decay);
                self.phase = 0.0;
            }
            TalkMode::Speaking => {
                self.phase += dt.max(0.0) * config.phase_rate;
                let wave = (self.phase * config.frequency).sin().abs() * config.amplitude;
                let jitter = (rng.gen::<f32>() - 0.5) * config.jitter;
                self.level = (wave + jitter).clamp(config.floor, config.ceiling);
            }
        }
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_speaking_stays_in_range() {
        let config = TalkConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut talk = TalkState::new();

        for i in 0..2000 {
            let dt = if i % 7 == 0 { 0.25 } else { 1.0 / 60.0 };
            let level = talk.step(TalkMode::Speaking, dt, &config, &mut rng);
            assert!((0.08..=0.58).contains(&level), "level {level} at frame {i}");
        }
    }

    #[test]
    fn test_typing_closes_mouth_quickly() {
        let config = TalkConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut talk = TalkState { level: 0.58, phase: 3.0 };

        let frames = (1..=30)
            .find(|_| talk.step(TalkMode::Typing, 1.0 / 60.0, &config, &mut rng) < 1e-3)
            .expect("mouth did not close within 30 frames");
        assert!(frames <= 20);
        assert_eq!(talk.phase(), 0.0);
    }

    #[test]
    fn test_idle_decays_at_idle_rate() {
        let config = TalkConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut talk = TalkState { level: 0.5, phase: 1.0 };

        let level = talk.step(TalkMode::Idle, 1.0 / 60.0, &config, &mut rng);
        assert!((level - 0.5 * 0.78).abs() < 1e-6);
        assert_eq!(talk.phase(), 0.0);
    }

    #[test]
    fn test_phase_restarts_after_silence() {
        let config = TalkConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut talk = TalkState::new();

        talk.step(TalkMode::Speaking, 0.1, &config, &mut rng);
        talk.step(TalkMode::Speaking, 0.1, &config, &mut rng);
        assert!((talk.phase() - 1.0).abs() < 1e-6);

        talk.step(TalkMode::Idle, 0.1, &config, &mut rng);
        talk.step(TalkMode::Speaking, 0.1, &config, &mut rng);
        assert!((talk.phase() - 0.5).abs() < 1e-6);
    }
}
