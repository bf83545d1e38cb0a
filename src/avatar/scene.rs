//! Scene graph seam between the animator and the render host.
//!
//! The animator never owns the model. It reads and writes bone transforms and
//! morph weights through [`SceneGraph`], which a renderer implements over its
//! own node storage. [`Scene`] is the in-memory implementation the service and
//! tests use; a browser renderer mirrors it from the streamed frame reports.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SceneError;

/// Index of a bone node in the host's skeleton
pub type NodeId = usize;
/// Index of a mesh carrying morph targets
pub type MeshId = usize;

/// Local transform of a bone, rotation as XYZ Euler angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Read-only view of a mesh's morph target names
#[derive(Debug, Clone, Copy)]
pub struct MorphMeshView<'a> {
    pub id: MeshId,
    pub name: &'a str,
    pub targets: &'a [String],
}

/// Operations the animator needs from the render host.
pub trait SceneGraph {
    /// All skeleton bones as `(node, name)` in traversal order.
    fn bones(&self) -> Vec<(NodeId, &str)>;

    /// All meshes that expose morph targets.
    fn morph_meshes(&self) -> Vec<MorphMeshView<'_>>;

    fn bone(&self, node: NodeId) -> Option<&BoneTransform>;

    fn bone_mut(&mut self, node: NodeId) -> Option<&mut BoneTransform>;

    /// Influence array of a mesh, indexed like its target names.
    fn morph_weights_mut(&mut self, mesh: MeshId) -> Option<&mut [f32]>;
}

/// A skeleton bone in the in-memory scene
#[derive(Debug, Clone, Serialize)]
pub struct Bone {
    pub name: String,
    pub transform: BoneTransform,
}

/// A mesh with named morph targets
#[derive(Debug, Clone, Serialize)]
pub struct MorphMesh {
    pub name: String,
    pub targets: Vec<String>,
    pub weights: Vec<f32>,
}

impl MorphMesh {
    /// Current weight of the named target
    pub fn weight(&self, target: &str) -> Option<f32> {
        self.targets
            .iter()
            .position(|t| t == target)
            .map(|i| self.weights[i])
    }
}

/// In-memory scene graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scene {
    bones: Vec<Bone>,
    meshes: Vec<MorphMesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bone with an identity transform
    pub fn add_bone(&mut self, name: &str) -> NodeId {
        self.add_bone_with(name, BoneTransform::default())
    }

    pub fn add_bone_with(&mut self, name: &str, transform: BoneTransform) -> NodeId {
        self.bones.push(Bone {
            name: name.to_string(),
            transform,
        });
        self.bones.len() - 1
    }

    /// Add a mesh whose weights all start at zero
    pub fn add_mesh(&mut self, name: &str, targets: &[&str]) -> MeshId {
        self.meshes.push(MorphMesh {
            name: name.to_string(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            weights: vec![0.0; targets.len()],
        });
        self.meshes.len() - 1
    }

    pub fn find_bone(&self, name: &str) -> Option<NodeId> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn bone_named(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Weight of `target` on the named mesh
    pub fn morph_weight(&self, mesh: &str, target: &str) -> Option<f32> {
        self.meshes
            .iter()
            .find(|m| m.name == mesh)
            .and_then(|m| m.weight(target))
    }

    /// Build a scene from a rig manifest
    pub fn from_manifest(manifest: &RigManifest) -> Result<Self, SceneError> {
        let mut scene = Self::new();

        for bone in &manifest.bones {
            let transform = BoneTransform {
                scale: bone.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
                ..Default::default()
            };
            scene.add_bone_with(&bone.name, transform);
        }

        for mesh in &manifest.meshes {
            let weights = match &mesh.weights {
                Some(w) if w.len() != mesh.targets.len() => {
                    return Err(SceneError::WeightCount {
                        mesh: mesh.name.clone(),
                        names: mesh.targets.len(),
                        weights: w.len(),
                    });
                }
                Some(w) => w.clone(),
                None => vec![0.0; mesh.targets.len()],
            };
            scene.meshes.push(MorphMesh {
                name: mesh.name.clone(),
                targets: mesh.targets.clone(),
                weights,
            });
        }

        Ok(scene)
    }

    /// Load a scene from a TOML rig manifest on disk
    pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SceneError::ReadManifest(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let manifest: RigManifest =
            toml::from_str(&contents).map_err(|e| SceneError::ParseManifest(e.to_string()))?;
        Self::from_manifest(&manifest)
    }

    /// Built-in VRoid-style humanoid: core skeleton plus one face mesh.
    pub fn humanoid() -> Self {
        let mut scene = Self::new();

        for name in HUMANOID_BONES {
            scene.add_bone(name);
        }
        scene.add_mesh("Face", HUMANOID_FACE_TARGETS);
        scene.add_mesh("Body", &[]);

        scene
    }
}

const HUMANOID_BONES: &[&str] = &[
    "J_Bip_C_Hips",
    "J_Bip_C_Spine",
    "J_Bip_C_Chest",
    "J_Bip_C_UpperChest",
    "J_Bip_C_Neck",
    "J_Bip_C_Head",
    "J_Adj_L_FaceEye",
    "J_Adj_R_FaceEye",
    "J_Bip_L_Shoulder",
    "J_Bip_L_UpperArm",
    "J_Bip_L_LowerArm",
    "J_Bip_L_Hand",
    "J_Bip_R_Shoulder",
    "J_Bip_R_UpperArm",
    "J_Bip_R_LowerArm",
    "J_Bip_R_Hand",
];

const HUMANOID_FACE_TARGETS: &[&str] = &[
    "Fcl_ALL_Neutral",
    "Fcl_ALL_Angry",
    "Fcl_ALL_Fun",
    "Fcl_ALL_Joy",
    "Fcl_ALL_Sorrow",
    "Fcl_EYE_Close",
    "Fcl_EYE_Close_L",
    "Fcl_EYE_Close_R",
    "Fcl_EYE_Joy",
    "Fcl_MTH_A",
    "Fcl_MTH_I",
    "Fcl_MTH_U",
    "Fcl_MTH_E",
    "Fcl_MTH_O",
    "Fcl_MTH_Fun",
    "Fcl_MTH_Joy",
];

impl SceneGraph for Scene {
    fn bones(&self) -> Vec<(NodeId, &str)> {
        self.bones
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.name.as_str()))
            .collect()
    }

    fn morph_meshes(&self) -> Vec<MorphMeshView<'_>> {
        self.meshes
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.targets.is_empty())
            .map(|(id, m)| MorphMeshView {
                id,
                name: &m.name,
                targets: &m.targets,
            })
            .collect()
    }

    fn bone(&self, node: NodeId) -> Option<&BoneTransform> {
        self.bones.get(node).map(|b| &b.transform)
    }

    fn bone_mut(&mut self, node: NodeId) -> Option<&mut BoneTransform> {
        self.bones.get_mut(node).map(|b| &mut b.transform)
    }

    fn morph_weights_mut(&mut self, mesh: MeshId) -> Option<&mut [f32]> {
        self.meshes.get_mut(mesh).map(|m| m.weights.as_mut_slice())
    }
}

/// On-disk description of a model's bones and morph targets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RigManifest {
    pub bones: Vec<BoneSpec>,
    pub meshes: Vec<MeshSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneSpec {
    pub name: String,
    /// Rest scale, defaults to `[1, 1, 1]`
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshSpec {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
    /// Initial weights, one per target
    #[serde(default)]
    pub weights: Option<Vec<f32>>,
}
