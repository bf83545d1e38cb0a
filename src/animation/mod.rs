//! Procedural avatar animation
//!
//! The [`Animator`] owns the small pieces of state each rule needs and writes
//! the results into a [`SceneGraph`] once per frame.

pub mod blink;
pub mod breathing;
pub mod pose;
pub mod smile;
pub mod talk;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::avatar::{
    ExpressionCategory, FrameInput, MorphBindings, RigBones, SceneGraph, TalkMode,
};
use crate::config::{AnimationConfig, PoseConfig};

pub use blink::{BlinkState, EyeRig};
pub use breathing::BreathingState;
pub use pose::RestPose;
pub use smile::SmileState;
pub use talk::TalkState;

/// Smile levels above this with no smile target written get a warning
const SMILE_WARN_LEVEL: f32 = 0.08;
/// Joy-eye levels above this with no joy-eye target written get a warning
const JOY_EYE_WARN_LEVEL: f32 = 0.3;

/// What one frame wrote into the scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub mode: TalkMode,
    /// Eye scale factor written this frame, if a blink is running
    pub blink: Option<f32>,
    pub smile: f32,
    pub joy_eye: f32,
    pub mouth: f32,
    pub breath: f32,
}

/// Per-frame mutable state of every rule
#[derive(Debug, Clone, Serialize)]
pub struct AnimatorState {
    pub blink: BlinkState,
    pub breathing: BreathingState,
    pub smile: SmileState,
    pub talk: TalkState,
}

/// Conditions already reported, so they log once rather than every frame
#[derive(Debug, Clone, Copy, Default)]
struct Warned {
    no_face_meshes: bool,
    no_smile: bool,
    no_joy_eye: bool,
}

pub struct Animator {
    rig: RigBones,
    eyes: Option<EyeRig>,
    morphs: MorphBindings,
    pose: RestPose,
    config: AnimationConfig,
    state: AnimatorState,
    warned: Warned,
    rng: StdRng,
}

impl Animator {
    /// Resolve bones and morph targets from `scene` and seed from entropy.
    pub fn new<S: SceneGraph + ?Sized>(
        scene: &S,
        pose: &PoseConfig,
        config: &AnimationConfig,
    ) -> Self {
        Self::with_rng(scene, pose, config, StdRng::from_entropy())
    }

    /// Same as [`new`](Self::new) with a caller-provided random source
    pub fn with_rng<S: SceneGraph + ?Sized>(
        scene: &S,
        pose: &PoseConfig,
        config: &AnimationConfig,
        mut rng: StdRng,
    ) -> Self {
        let rig = RigBones::resolve(scene);
        let eyes = EyeRig::capture(scene, &rig);
        if eyes.is_none() {
            tracing::warn!("Need both eye bones to blink, found {}", rig.eye_count());
        }
        let morphs = MorphBindings::resolve(scene);

        let state = AnimatorState {
            blink: BlinkState::new(&config.blink, &mut rng),
            breathing: BreathingState::new(),
            smile: SmileState::new(),
            talk: TalkState::new(),
        };

        Self {
            rig,
            eyes,
            morphs,
            pose: RestPose::from(pose),
            config: config.clone(),
            state,
            warned: Warned::default(),
            rng,
        }
    }

    pub fn rig(&self) -> &RigBones {
        &self.rig
    }

    pub fn morphs(&self) -> &MorphBindings {
        &self.morphs
    }

    pub fn state(&self) -> &AnimatorState {
        &self.state
    }

    pub fn rest_pose(&self) -> &RestPose {
        &self.pose
    }

    /// Apply the one-shot resting arm pose. Returns false if the arms are missing.
    pub fn apply_static_pose<S: SceneGraph + ?Sized>(&self, scene: &mut S) -> bool {
        pose::apply_static_pose(scene, &self.rig, &self.pose)
    }

    /// Advance every rule by `dt` seconds and write the results into `scene`.
    ///
    /// Order is blink, breathing, smile, talk.
    pub fn update<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        dt: f32,
        input: &FrameInput,
    ) -> FrameReport {
        let blink = self.update_blink(scene, dt);
        let breath = self.update_breathing(scene, dt);
        let (smile, joy_eye) = self.update_smile(scene, input.composing);
        let mode = input.talk_mode();
        let mouth = self.update_talk(scene, mode, dt);

        FrameReport {
            mode,
            blink,
            smile,
            joy_eye,
            mouth,
            breath,
        }
    }

    fn update_blink<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, dt: f32) -> Option<f32> {
        let eyes = self.eyes?;
        let factor = self
            .state
            .blink
            .step(dt, &self.config.blink, &mut self.rng)?;
        eyes.apply(scene, factor);
        Some(factor)
    }

    fn update_breathing<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, dt: f32) -> f32 {
        if !breathing::can_breathe(&self.rig) {
            return 0.0;
        }
        let breath = self.state.breathing.step(dt, &self.config.breathing);
        breathing::apply_breathing(
            scene,
            &self.rig,
            breath,
            self.pose.arm_down,
            &self.config.breathing,
        );
        breath
    }

    fn update_smile<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        composing: bool,
    ) -> (f32, f32) {
        let level = self.state.smile.step(composing, &self.config.smile);
        let joy_eye = smile::joy_eye_level(level, &self.config.smile);

        if self.morphs.face_mesh_count() == 0 {
            if !self.warned.no_face_meshes {
                tracing::warn!("No face meshes found, smile disabled");
                self.warned.no_face_meshes = true;
            }
            return (level, joy_eye);
        }

        let smiled = self.morphs.apply(scene, ExpressionCategory::Smile, level);
        let squinted = self.morphs.apply(scene, ExpressionCategory::JoyEye, joy_eye);

        if smiled == 0 && level > SMILE_WARN_LEVEL && !self.warned.no_smile {
            tracing::warn!("Smile at {:.2} but no smile blendshape was written", level);
            self.warned.no_smile = true;
        }
        if squinted == 0 && level > JOY_EYE_WARN_LEVEL && !self.warned.no_joy_eye {
            tracing::warn!("Smile at {:.2} but no joy-eye blendshape was written", level);
            self.warned.no_joy_eye = true;
        }

        (level, joy_eye)
    }

    fn update_talk<S: SceneGraph + ?Sized>(
        &mut self,
        scene: &mut S,
        mode: TalkMode,
        dt: f32,
    ) -> f32 {
        let level = self
            .state
            .talk
            .step(mode, dt, &self.config.talk, &mut self.rng);
        self.morphs.apply(scene, ExpressionCategory::Talk, level);
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{BoneTransform, ChatInput, Scene, SpeechFlags};
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    fn animator(scene: &Scene) -> Animator {
        Animator::with_rng(
            scene,
            &PoseConfig::default(),
            &AnimationConfig::default(),
            StdRng::seed_from_u64(2024),
        )
    }

    fn composing() -> FrameInput {
        let mut input = ChatInput::new();
        input.focus();
        input.set_text("hello");
        FrameInput::new(&input, &SpeechFlags::default())
    }

    fn speaking() -> FrameInput {
        FrameInput::new(&ChatInput::new(), &SpeechFlags::default().with_ai_talking(true))
    }

    #[test]
    fn test_humanoid_frame() {
        let mut scene = Scene::humanoid();
        let mut animator = animator(&scene);
        assert!(animator.apply_static_pose(&mut scene));

        let report = animator.update(&mut scene, DT, &composing());
        assert_eq!(report.mode, TalkMode::Typing);
        assert!((report.smile - 0.85 * 0.24).abs() < 1e-6);
        assert_eq!(scene.morph_weight("Face", "Fcl_MTH_Fun"), Some(report.smile));
        assert_eq!(scene.morph_weight("Face", "Fcl_EYE_Joy"), Some(report.joy_eye));

        let spine = scene.bone_named("J_Bip_C_Spine").unwrap().transform;
        assert!((spine.rotation.x - (0.02 + report.breath * 0.05)).abs() < 1e-7);

        let arm = scene.bone_named("J_Bip_L_UpperArm").unwrap().transform;
        let expected = animator.rest_pose().arm_down + report.breath * 0.02;
        assert!((arm.rotation.x - expected).abs() < 1e-6);
        assert_eq!(arm.rotation.z, animator.rest_pose().arm_forward);
    }

    #[test]
    fn test_speaking_drives_talk_targets() {
        let mut scene = Scene::humanoid();
        let mut animator = animator(&scene);

        for _ in 0..120 {
            let report = animator.update(&mut scene, DT, &speaking());
            assert_eq!(report.mode, TalkMode::Speaking);
            assert!((0.08..=0.58).contains(&report.mouth));
            assert_eq!(scene.morph_weight("Face", "Fcl_MTH_A"), Some(report.mouth));
            assert_eq!(scene.morph_weight("Face", "Fcl_MTH_O"), Some(report.mouth));
        }
    }

    #[test]
    fn test_typing_silences_speech() {
        let mut scene = Scene::humanoid();
        let mut animator = animator(&scene);
        for _ in 0..30 {
            animator.update(&mut scene, DT, &speaking());
        }

        let both = FrameInput {
            composing: true,
            user_typing: true,
            ai_speaking: true,
        };
        let mut mouth = f32::MAX;
        for _ in 0..30 {
            let report = animator.update(&mut scene, DT, &both);
            assert_eq!(report.mode, TalkMode::Typing);
            assert!(report.mouth < mouth);
            mouth = report.mouth;
        }
        assert!(mouth < 1e-3);
        assert_eq!(animator.state().talk.phase(), 0.0);
    }

    #[test]
    fn test_blink_scales_eyes_within_bounds() {
        let mut scene = Scene::new();
        let rest = BoneTransform {
            scale: Vec3::new(1.0, 0.8, 1.0),
            ..Default::default()
        };
        let left = scene.add_bone_with("leftEye", rest);
        let right = scene.add_bone_with("rightEye", rest);
        let mut animator = animator(&scene);

        let mut blinked = false;
        for _ in 0..(60 * 12) {
            let report = animator.update(&mut scene, DT, &FrameInput::default());
            for node in [left, right] {
                let y = scene.bone(node).unwrap().scale.y;
                assert!(y >= 0.2 * 0.8 - 1e-6 && y <= 0.8 + 1e-6, "eye scale {y}");
            }
            blinked |= report.blink.is_some_and(|f| f < 1.0);
        }
        assert!(blinked);
    }

    #[test]
    fn test_empty_scene_is_noop() {
        let mut scene = Scene::new();
        let mut animator = animator(&scene);

        assert!(!animator.apply_static_pose(&mut scene));
        for _ in 0..600 {
            let report = animator.update(&mut scene, DT, &composing());
            assert_eq!(report.blink, None);
            assert_eq!(report.breath, 0.0);
        }
        // Smile level still tracks input so a later model can pick it up
        assert!(animator.state().smile.level() > 0.8);
    }

    #[test]
    fn test_report_serializes_lowercase_mode() {
        let report = FrameReport {
            mode: TalkMode::Speaking,
            ..Default::default()
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["mode"], "speaking");
        assert!(json["blink"].is_null());
    }
}
