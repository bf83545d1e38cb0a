//! Expression category → morph target bindings.
//!
//! Each category lists every name the same control goes by across VRM,
//! VRoid, ARKit and VRChat conventions. Names are resolved once per model into
//! `(mesh, index)` slots so the per-frame path never touches strings.

use serde::Serialize;
use std::collections::HashMap;

use super::scene::{MeshId, MorphMeshView, SceneGraph};

/// Semantic facial control driven by the animator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionCategory {
    Smile,
    JoyEye,
    Talk,
}

impl ExpressionCategory {
    pub const ALL: [ExpressionCategory; 3] = [Self::Smile, Self::JoyEye, Self::Talk];

    /// Candidate morph target names, in lookup order
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::Smile => SMILE_NAMES,
            Self::JoyEye => JOY_EYE_NAMES,
            Self::Talk => TALK_NAMES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smile => "smile",
            Self::JoyEye => "joy_eye",
            Self::Talk => "talk",
        }
    }
}

impl std::fmt::Display for ExpressionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SMILE_NAMES: &[&str] = &[
    "Joy", "joy", "JOY",
    "Fun", "fun", "FUN",
    "Happy", "happy",
    "Smile", "smile",
    "mouthSmile", "mouth_smile",
    "mouthSmileLeft", "mouthSmileRight",
    "mouthSmile_L", "mouthSmile_R",
    "mouthSmileLeft_L", "mouthSmileRight_R",
    "MTH_Fun", "Fcl_MTH_Fun", "M_F00_000_00_Fcl_MTH_Fun",
    "MTH_Joy", "Fcl_MTH_Joy", "M_F00_000_00_Fcl_MTH_Joy",
    "Smile_L", "Smile_R",
    "mouthOpenSmile", "mouth_smile_open",
    "vrc.smile", "vrc.joy", "vrc.fun",
    "A", "a", "E", "e",
];

const JOY_EYE_NAMES: &[&str] = &[
    "Joy", "joy", "JOY",
    "Fcl_EYE_Joy", "EYE_Joy", "eyeJoy",
    "eyeJoy_L", "eyeJoy_R", "EYE_Joy_L", "EYE_Joy_R",
    "eyeSquint", "eye_squint",
    "eyeSquintLeft", "eyeSquintRight",
    "eyeSquint_L", "eyeSquint_R",
    "Fcl_EYE_Squint", "squint", "Squint",
    "EyeJoy", "Eye_Squint", "vrc.eye_squint",
];

const TALK_NAMES: &[&str] = &[
    "A", "a", "I", "i", "U", "u", "E", "e", "O", "o",
    "Fcl_MTH_A", "Fcl_MTH_I", "Fcl_MTH_U", "Fcl_MTH_E", "Fcl_MTH_O",
    "MTH_A", "MTH_I", "MTH_U", "MTH_E", "MTH_O",
    "mouthOpen", "mouth_open", "MouthOpen", "mouthO", "mouth_A",
    "aa", "ih", "ou", "oh", "EE", "OO",
    "Fcl_MTH_Open",
    "M_F00_000_00_Fcl_MTH_A", "M_F00_000_00_Fcl_MTH_I",
    "M_F00_000_00_Fcl_MTH_U", "M_F00_000_00_Fcl_MTH_E", "M_F00_000_00_Fcl_MTH_O",
];

/// One morph target influence on one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MorphSlot {
    pub mesh: MeshId,
    pub index: usize,
}

/// Resolved slots for every expression category
#[derive(Debug, Clone, Default)]
pub struct MorphBindings {
    slots: HashMap<ExpressionCategory, Vec<MorphSlot>>,
    face_meshes: usize,
}

impl MorphBindings {
    /// Discover face meshes in the scene and bind every category.
    pub fn resolve<S: SceneGraph + ?Sized>(scene: &S) -> Self {
        Self::from_meshes(&scene.morph_meshes())
    }

    pub fn from_meshes(meshes: &[MorphMeshView<'_>]) -> Self {
        for mesh in meshes {
            tracing::info!(
                "Found face mesh with blendshapes: {} ({} shapes)",
                mesh.name,
                mesh.targets.len()
            );
        }
        if let Some(first) = meshes.first() {
            tracing::debug!("Morph targets on {}: {:?}", first.name, first.targets);
        }

        let mut slots = HashMap::new();
        for category in ExpressionCategory::ALL {
            let bound = bind_category(meshes, category);
            if bound.is_empty() {
                tracing::warn!(
                    "No {} blendshapes found among {} candidate names",
                    category,
                    category.candidates().len()
                );
            } else {
                tracing::info!("Bound {} {} blendshapes", bound.len(), category);
            }
            slots.insert(category, bound);
        }

        Self {
            slots,
            face_meshes: meshes.len(),
        }
    }

    pub fn slots(&self, category: ExpressionCategory) -> &[MorphSlot] {
        self.slots.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn face_mesh_count(&self) -> usize {
        self.face_meshes
    }

    /// Write `value` (clamped to [0, 1]) into every slot of `category`.
    ///
    /// Returns how many slots were written.
    pub fn apply<S: SceneGraph + ?Sized>(
        &self,
        scene: &mut S,
        category: ExpressionCategory,
        value: f32,
    ) -> usize {
        let value = value.clamp(0.0, 1.0);
        let mut applied = 0;

        for slot in self.slots(category) {
            if let Some(weight) = scene
                .morph_weights_mut(slot.mesh)
                .and_then(|w| w.get_mut(slot.index))
            {
                *weight = value;
                applied += 1;
            }
        }

        applied
    }
}

fn bind_category(meshes: &[MorphMeshView<'_>], category: ExpressionCategory) -> Vec<MorphSlot> {
    let mut bound: Vec<MorphSlot> = Vec::new();

    for mesh in meshes {
        let name_to_index: HashMap<&str, usize> = mesh
            .targets
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        for candidate in category.candidates() {
            if let Some(&index) = name_to_index.get(candidate) {
                let slot = MorphSlot {
                    mesh: mesh.id,
                    index,
                };
                if !bound.contains(&slot) {
                    tracing::debug!(
                        "{} blendshape found: {} (index {}) on mesh {}",
                        category,
                        candidate,
                        index,
                        mesh.name
                    );
                    bound.push(slot);
                }
            }
        }
    }

    bound
}
