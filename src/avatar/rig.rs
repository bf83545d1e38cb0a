//! Bone discovery for the procedural rig.
//!
//! Models arrive with inconsistent bone naming (VRM humanoid, VRoid `J_Bip_*`,
//! Mixamo, hand-rigged). Bones are classified once at load time by
//! case-insensitive substring rules and stored as node handles.

use serde::Serialize;

use super::scene::{NodeId, SceneGraph};

/// Which side of the body a bone name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Classify the side of a lowercased bone name.
///
/// `left`/`right` may appear anywhere (`lefteye`, `mixamorig:leftarm`); the
/// single-letter forms only count as a whole `_`/`.`/`:`-separated token so
/// that `j_bip_r_lowerarm` is not read as left via `_l`.
fn side_of(name: &str) -> Option<Side> {
    let has_token = |t: &str| {
        name.split(|c: char| c == '_' || c == '.' || c == ':' || c == '-' || c == ' ')
            .any(|tok| tok == t)
    };

    if name.contains("left") || has_token("l") {
        Some(Side::Left)
    } else if name.contains("right") || has_token("r") {
        Some(Side::Right)
    } else {
        None
    }
}

/// Resolved bone handles for everything the animator drives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RigBones {
    pub left_eye: Option<NodeId>,
    pub right_eye: Option<NodeId>,
    pub left_upper_arm: Option<NodeId>,
    pub right_upper_arm: Option<NodeId>,
    pub left_lower_arm: Option<NodeId>,
    pub right_lower_arm: Option<NodeId>,
    pub left_hand: Option<NodeId>,
    pub right_hand: Option<NodeId>,
    pub spine: Option<NodeId>,
    pub chest: Option<NodeId>,
    pub neck: Option<NodeId>,
    pub head: Option<NodeId>,
}

impl RigBones {
    /// Classify every bone of the scene.
    pub fn resolve<S: SceneGraph + ?Sized>(scene: &S) -> Self {
        Self::from_names(scene.bones())
    }

    /// Classify `(node, name)` pairs in traversal order.
    ///
    /// Later matches overwrite earlier ones for eyes, arms, hands, neck and
    /// head; spine and chest keep their first match.
    pub fn from_names<'a, I>(bones: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, &'a str)>,
    {
        let mut rig = Self::default();
        let mut sided_eyes = 0usize;

        for (node, raw) in bones {
            let name = raw.to_lowercase();
            let side = side_of(&name);

            if name.contains("eye") {
                match side {
                    Some(Side::Left) => {
                        rig.left_eye = Some(node);
                        sided_eyes += 1;
                        tracing::debug!("Found left eye bone: {}", raw);
                    }
                    Some(Side::Right) => {
                        rig.right_eye = Some(node);
                        sided_eyes += 1;
                        tracing::debug!("Found right eye bone: {}", raw);
                    }
                    None if rig.left_eye.is_none() && sided_eyes == 0 => {
                        rig.left_eye = Some(node);
                        tracing::debug!("Using unsided eye bone as left: {}", raw);
                    }
                    None if rig.right_eye.is_none() && sided_eyes == 1 => {
                        rig.right_eye = Some(node);
                        tracing::debug!("Using unsided eye bone as right: {}", raw);
                    }
                    None => {}
                }
            }

            if name.contains("upperarm") || name.contains("upper_arm") || name.contains("shoulder")
            {
                match side {
                    Some(Side::Left) => rig.left_upper_arm = Some(node),
                    Some(Side::Right) => rig.right_upper_arm = Some(node),
                    None => {}
                }
            } else if name.contains("lowerarm")
                || name.contains("lower_arm")
                || name.contains("forearm")
            {
                match side {
                    Some(Side::Left) => rig.left_lower_arm = Some(node),
                    Some(Side::Right) => rig.right_lower_arm = Some(node),
                    None => {}
                }
            } else if name.contains("hand") {
                match side {
                    Some(Side::Left) => rig.left_hand = Some(node),
                    Some(Side::Right) => rig.right_hand = Some(node),
                    None => {}
                }
            } else if name.contains("spine") || name.contains("chest") {
                if rig.spine.is_none() && name.contains("spine") {
                    rig.spine = Some(node);
                }
                if rig.chest.is_none() && name.contains("chest") {
                    rig.chest = Some(node);
                }
            } else if name.contains("neck") {
                rig.neck = Some(node);
            } else if name.contains("head") {
                rig.head = Some(node);
            }

            if rig.left_upper_arm.is_none()
                && side == Some(Side::Left)
                && (name.contains("l_arm") || name == "leftarm" || name == "left_arm")
            {
                rig.left_upper_arm = Some(node);
            }
            if rig.right_upper_arm.is_none()
                && side == Some(Side::Right)
                && (name.contains("r_arm") || name == "rightarm" || name == "right_arm")
            {
                rig.right_upper_arm = Some(node);
            }
        }

        tracing::info!("Found {} eye bones for blinking", rig.eye_count());
        tracing::debug!("Resolved rig: {:?}", rig);

        rig
    }

    pub fn eye_count(&self) -> usize {
        self.left_eye.is_some() as usize + self.right_eye.is_some() as usize
    }

    /// Both eyes, if both were found
    pub fn eyes(&self) -> Option<(NodeId, NodeId)> {
        self.left_eye.zip(self.right_eye)
    }

    /// Both upper arms, if both were found
    pub fn upper_arms(&self) -> Option<(NodeId, NodeId)> {
        self.left_upper_arm.zip(self.right_upper_arm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::scene::Scene;

    fn resolve(names: &[&str]) -> RigBones {
        RigBones::from_names(names.iter().copied().enumerate())
    }

    #[test]
    fn test_vroid_humanoid() {
        let scene = Scene::humanoid();
        let rig = RigBones::resolve(&scene);

        assert_eq!(rig.left_eye, scene.find_bone("J_Adj_L_FaceEye"));
        assert_eq!(rig.right_eye, scene.find_bone("J_Adj_R_FaceEye"));
        // Shoulder matches first, the upper arm later overwrites it
        assert_eq!(rig.left_upper_arm, scene.find_bone("J_Bip_L_UpperArm"));
        assert_eq!(rig.right_upper_arm, scene.find_bone("J_Bip_R_UpperArm"));
        assert_eq!(rig.right_lower_arm, scene.find_bone("J_Bip_R_LowerArm"));
        assert_eq!(rig.left_lower_arm, scene.find_bone("J_Bip_L_LowerArm"));
        assert_eq!(rig.right_hand, scene.find_bone("J_Bip_R_Hand"));
        assert_eq!(rig.spine, scene.find_bone("J_Bip_C_Spine"));
        assert_eq!(rig.chest, scene.find_bone("J_Bip_C_Chest"));
        assert_eq!(rig.neck, scene.find_bone("J_Bip_C_Neck"));
        assert_eq!(rig.head, scene.find_bone("J_Bip_C_Head"));
    }

    #[test]
    fn test_vrm_humanoid_names() {
        let rig = resolve(&[
            "leftEye",
            "rightEye",
            "leftUpperArm",
            "rightUpperArm",
            "leftLowerArm",
            "rightLowerArm",
            "leftHand",
            "rightHand",
        ]);

        assert_eq!(rig.eyes(), Some((0, 1)));
        assert_eq!(rig.upper_arms(), Some((2, 3)));
        assert_eq!(rig.left_lower_arm, Some(4));
        assert_eq!(rig.right_lower_arm, Some(5));
        assert_eq!(rig.left_hand, Some(6));
        assert_eq!(rig.right_hand, Some(7));
    }

    #[test]
    fn test_unsided_eyes_fill_left_then_right() {
        let rig = resolve(&["Eye", "Eye.001"]);
        assert_eq!(rig.left_eye, Some(0));
        assert_eq!(rig.right_eye, None);

        // A second unsided eye only fills right once one sided eye was seen
        let rig = resolve(&["eye_L", "EyeBall"]);
        assert_eq!(rig.left_eye, Some(0));
        assert_eq!(rig.right_eye, Some(1));
    }

    #[test]
    fn test_spine_and_chest_keep_first_match() {
        let rig = resolve(&["Spine", "Spine1", "Chest", "UpperChest"]);
        assert_eq!(rig.spine, Some(0));
        assert_eq!(rig.chest, Some(2));
    }

    #[test]
    fn test_arm_fallback_names() {
        let rig = resolve(&["LeftArm", "Right_Arm", "l_arm_twist"]);
        assert_eq!(rig.left_upper_arm, Some(0));
        assert_eq!(rig.right_upper_arm, Some(1));
    }

    #[test]
    fn test_arm_fallback_respects_side() {
        // `left_lower_arm` contains `r_arm` but is a left bone
        let rig = resolve(&["left_upper_arm", "left_lower_arm"]);
        assert_eq!(rig.left_upper_arm, Some(0));
        assert_eq!(rig.right_upper_arm, None);
        assert!(rig.upper_arms().is_none());
    }

    #[test]
    fn test_missing_bones_stay_empty() {
        let rig = resolve(&["Hips", "Root"]);
        assert_eq!(rig, RigBones::default());
        assert_eq!(rig.eye_count(), 0);
        assert!(rig.eyes().is_none());
    }
}
