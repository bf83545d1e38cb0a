//! Idle breathing sway on the torso and shoulders

use serde::Serialize;

use crate::avatar::{RigBones, SceneGraph};
use crate::config::BreathingConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BreathingState {
    timer: f32,
}

impl BreathingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the phase and return this frame's breath offset.
    pub fn step(&mut self, dt: f32, config: &BreathingConfig) -> f32 {
        self.timer += dt.max(0.0) * config.rate;
        self.timer.sin() * config.amplitude
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }
}

/// Whether the rig has anything to breathe with
pub fn can_breathe(rig: &RigBones) -> bool {
    rig.spine.is_some() || rig.chest.is_some()
}

/// Write the breath offset onto spine, chest and both upper arms.
///
/// `arm_down` is the static pose's upper-arm X angle the sway is layered on.
pub fn apply_breathing<S: SceneGraph + ?Sized>(
    scene: &mut S,
    rig: &RigBones,
    breath: f32,
    arm_down: f32,
    config: &BreathingConfig,
) {
    if let Some(bone) = rig.spine.and_then(|n| scene.bone_mut(n)) {
        bone.rotation.x = config.spine_base + breath * config.spine_gain;
    }
    if let Some(bone) = rig.chest.and_then(|n| scene.bone_mut(n)) {
        bone.rotation.x = config.chest_base + breath * config.chest_gain;
    }
    for node in [rig.left_upper_arm, rig.right_upper_arm].into_iter().flatten() {
        if let Some(bone) = scene.bone_mut(node) {
            bone.rotation.x = arm_down + breath * config.arm_gain;
        }
    }
}
