//! Eye blinking via vertical eye-bone scale.
//!
//! A blink waits a random interval, then runs a triangular close/open ramp
//! over a fixed phase range and restores the eye's original scale.

use rand::Rng;
use serde::Serialize;

use crate::avatar::{NodeId, RigBones, SceneGraph};
use crate::config::BlinkConfig;

/// Eye bones with the Y scale they had at load time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeRig {
    pub left: NodeId,
    pub right: NodeId,
    pub left_scale_y: f32,
    pub right_scale_y: f32,
}

impl EyeRig {
    /// Capture both eyes' rest scale. `None` unless both eyes resolved.
    pub fn capture<S: SceneGraph + ?Sized>(scene: &S, rig: &RigBones) -> Option<Self> {
        let (left, right) = rig.eyes()?;
        let rest_y = |node| {
            scene
                .bone(node)
                .map(|b| b.scale.y)
                .filter(|y| *y != 0.0)
                .unwrap_or(1.0)
        };

        Some(Self {
            left,
            right,
            left_scale_y: rest_y(left),
            right_scale_y: rest_y(right),
        })
    }

    /// Set both eyes to `factor` times their rest scale
    pub fn apply<S: SceneGraph + ?Sized>(&self, scene: &mut S, factor: f32) {
        if let Some(bone) = scene.bone_mut(self.left) {
            bone.scale.y = factor * self.left_scale_y;
        }
        if let Some(bone) = scene.bone_mut(self.right) {
            bone.scale.y = factor * self.right_scale_y;
        }
    }
}

/// Blink timer and phase
#[derive(Debug, Clone, Serialize)]
pub struct BlinkState {
    /// 0 when idle, otherwise progress through the current blink
    phase: f32,
    /// Seconds since the last blink started
    timer: f32,
    /// Seconds to wait before the next blink
    threshold: f32,
}

impl BlinkState {
    pub fn new<R: Rng + ?Sized>(config: &BlinkConfig, rng: &mut R) -> Self {
        Self {
            phase: 0.0,
            timer: 0.0,
            threshold: next_interval(config, rng),
        }
    }

    pub fn is_blinking(&self) -> bool {
        self.phase > 0.0
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advance by `dt` seconds.
    ///
    /// Returns the eye scale factor to write this frame, or `None` when no
    /// blink is in progress. The final frame of a blink returns `Some(1.0)`.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        config: &BlinkConfig,
        rng: &mut R,
    ) -> Option<f32> {
        let dt = dt.max(0.0);
        self.timer += dt;

        if self.timer > self.threshold {
            self.phase = config.start_phase;
            self.timer = 0.0;
            self.threshold = next_interval(config, rng);
        }

        if self.phase <= 0.0 {
            return None;
        }

        self.phase += dt * config.speed;

        if self.phase > 1.0 {
            self.phase = 0.0;
            return Some(1.0);
        }

        Some(scale_factor(closure(self.phase), config.closed_scale))
    }
}

/// Triangular closure ramp: 0 → 1 over phase [0, 0.5], back to 0 at 1.
pub fn closure(phase: f32) -> f32 {
    let ramp = if phase < 0.5 {
        phase * 2.0
    } else {
        (1.0 - phase) * 2.0
    };
    ramp.clamp(0.0, 1.0)
}

/// Map closure to an eye scale factor in `[closed_scale, 1]`.
pub fn scale_factor(closure: f32, closed_scale: f32) -> f32 {
    let closed_scale = closed_scale.clamp(0.0, 1.0);
    1.0 - closure.clamp(0.0, 1.0) * (1.0 - closed_scale)
}

fn next_interval<R: Rng + ?Sized>(config: &BlinkConfig, rng: &mut R) -> f32 {
    if config.interval_max_secs > config.interval_min_secs {
        rng.gen_range(config.interval_min_secs..config.interval_max_secs)
    } else {
        config.interval_min_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{BoneTransform, Scene};
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_closure_ramp() {
        assert_eq!(closure(0.0), 0.0);
        assert!((closure(0.25) - 0.5).abs() < 1e-6);
        assert_eq!(closure(0.5), 1.0);
        assert!((closure(0.75) - 0.5).abs() < 1e-6);
        assert_eq!(closure(1.0), 0.0);
        assert_eq!(closure(1.5), 0.0);
    }

    #[test]
    fn test_scale_floor() {
        assert_eq!(scale_factor(0.0, 0.2), 1.0);
        assert!((scale_factor(1.0, 0.2) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_waits_at_least_min_interval() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut blink = BlinkState::new(&config, &mut rng);

        // 2.9s of frames: never blinks
        for _ in 0..174 {
            assert_eq!(blink.step(1.0 / 60.0, &config, &mut rng), None);
        }

        // By 5s one must have started
        let started = (0..130).any(|_| blink.step(1.0 / 60.0, &config, &mut rng).is_some());
        assert!(started);
    }

    #[test]
    fn test_cycle_restores_scale() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut blink = BlinkState::new(&config, &mut rng);

        let dt = 1.0 / 120.0;
        let mut first = None;
        for _ in 0..1000 {
            first = blink.step(dt, &config, &mut rng);
            if first.is_some() {
                break;
            }
        }
        let first = first.expect("blink never started");
        assert!(first < 1.0);

        let mut last = Some(first);
        let mut frames = 0;
        while blink.is_blinking() {
            last = blink.step(dt, &config, &mut rng);
            frames += 1;
            assert!(frames < 100, "blink never ended");
        }
        assert_eq!(last, Some(1.0));
        assert_eq!(blink.step(dt, &config, &mut rng), None);
    }

    #[test]
    fn test_long_frame_finishes_blink_at_once() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut blink = BlinkState::new(&config, &mut rng);

        assert_eq!(blink.step(5.0, &config, &mut rng), Some(1.0));
        assert!(!blink.is_blinking());
    }

    #[test]
    fn test_factor_bounds_for_any_dt() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut blink = BlinkState::new(&config, &mut rng);

        for _ in 0..20_000 {
            let dt: f32 = match rng.gen_range(0..4) {
                0 => 0.0,
                1 => rng.gen_range(0.0..0.05),
                2 => rng.gen_range(0.0..1.0),
                _ => rng.gen_range(0.0..8.0),
            };
            if let Some(factor) = blink.step(dt, &config, &mut rng) {
                assert!(
                    (0.2 - 1e-6..=1.0).contains(&factor),
                    "factor {factor} out of range for dt {dt}"
                );
            }
            assert!((0.0..=1.0).contains(&closure(blink.phase())));
        }
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let config = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut blink = BlinkState::new(&config, &mut rng);

        assert_eq!(blink.step(-10.0, &config, &mut rng), None);
        assert!(!blink.is_blinking());
    }

    #[test]
    fn test_eye_rig_scales_from_rest() {
        let mut scene = Scene::new();
        let left = scene.add_bone_with(
            "leftEye",
            BoneTransform {
                scale: Vec3::new(1.0, 0.5, 1.0),
                ..Default::default()
            },
        );
        let right = scene.add_bone("rightEye");

        let rig = RigBones::resolve(&scene);
        let eyes = EyeRig::capture(&scene, &rig).unwrap();
        eyes.apply(&mut scene, 0.2);

        assert!((scene.bone(left).unwrap().scale.y - 0.1).abs() < 1e-6);
        assert!((scene.bone(right).unwrap().scale.y - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_eye_rig_needs_both_eyes() {
        let mut scene = Scene::new();
        scene.add_bone("leftEye");
        let rig = RigBones::resolve(&scene);

        assert!(EyeRig::capture(&scene, &rig).is_none());
    }
}
