//! Static resting arm pose

use glam::Vec3;

use crate::avatar::{RigBones, SceneGraph};
use crate::config::PoseConfig;

/// Pose angles in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestPose {
    /// Upper arm X rotation
    pub arm_down: f32,
    /// Upper arm Z rotation, mirrored on the right
    pub arm_forward: f32,
    /// Hand Z roll, mirrored on the right
    pub hand_roll: f32,
}

impl From<&PoseConfig> for RestPose {
    fn from(config: &PoseConfig) -> Self {
        Self {
            arm_down: config.upper_arm_down_deg.to_radians(),
            arm_forward: config.upper_arm_forward_deg.to_radians(),
            hand_roll: config.hand_roll_deg.to_radians(),
        }
    }
}

impl Default for RestPose {
    fn default() -> Self {
        Self::from(&PoseConfig::default())
    }
}

/// Lower the arms out of the bind pose.
///
/// Requires both upper arms; lower arms and hands are set when present.
/// Returns false when the pose could not be applied.
pub fn apply_static_pose<S: SceneGraph + ?Sized>(
    scene: &mut S,
    rig: &RigBones,
    pose: &RestPose,
) -> bool {
    let Some((left_upper, right_upper)) = rig.upper_arms() else {
        tracing::warn!("Upper arm bones not found, skipping static pose");
        return false;
    };

    if let Some(bone) = scene.bone_mut(left_upper) {
        bone.rotation.x = pose.arm_down;
        bone.rotation.z = pose.arm_forward;
    }
    if let Some(bone) = scene.bone_mut(right_upper) {
        bone.rotation.x = pose.arm_down;
        bone.rotation.z = -pose.arm_forward;
    }

    for node in [rig.left_lower_arm, rig.right_lower_arm].into_iter().flatten() {
        if let Some(bone) = scene.bone_mut(node) {
            bone.rotation = Vec3::ZERO;
        }
    }

    if let Some(bone) = rig.left_hand.and_then(|n| scene.bone_mut(n)) {
        bone.rotation = Vec3::new(0.0, 0.0, pose.hand_roll);
    }
    if let Some(bone) = rig.right_hand.and_then(|n| scene.bone_mut(n)) {
        bone.rotation = Vec3::new(0.0, 0.0, -pose.hand_roll);
    }

    tracing::info!("Static pose applied");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{BoneTransform, Scene};

    #[test]
    fn test_default_angles() {
        let pose = RestPose::default();
        assert!((pose.arm_down - 120f32.to_radians()).abs() < 1e-6);
        assert!((pose.arm_forward - 77f32.to_radians()).abs() < 1e-6);
        assert!((pose.hand_roll - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_applies_mirrored_pose() {
        let mut scene = Scene::humanoid();
        let lower = scene.find_bone("J_Bip_R_LowerArm").unwrap();
        scene.bone_mut(lower).unwrap().rotation = Vec3::splat(0.4);

        let rig = RigBones::resolve(&scene);
        let pose = RestPose::default();
        assert!(apply_static_pose(&mut scene, &rig, &pose));

        let left = scene.bone_named("J_Bip_L_UpperArm").unwrap().transform;
        let right = scene.bone_named("J_Bip_R_UpperArm").unwrap().transform;
        assert_eq!(left.rotation.x, pose.arm_down);
        assert_eq!(left.rotation.z, pose.arm_forward);
        assert_eq!(right.rotation.x, pose.arm_down);
        assert_eq!(right.rotation.z, -pose.arm_forward);

        assert_eq!(scene.bone(lower).unwrap().rotation, Vec3::ZERO);

        let right_hand = scene.bone_named("J_Bip_R_Hand").unwrap().transform;
        assert_eq!(right_hand.rotation, Vec3::new(0.0, 0.0, -pose.hand_roll));
    }

    #[test]
    fn test_noop_without_both_upper_arms() {
        let mut scene = Scene::new();
        scene.add_bone("leftUpperArm");
        let hand = scene.add_bone("leftHand");

        let rig = RigBones::resolve(&scene);
        assert!(!apply_static_pose(&mut scene, &rig, &RestPose::default()));
        assert_eq!(*scene.bone(hand).unwrap(), BoneTransform::default());
    }
}
