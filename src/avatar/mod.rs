//! Avatar model access
//!
//! Scene graph seam, bone and morph target discovery, and the external
//! signals that steer animation.

pub mod morphs;
pub mod rig;
pub mod scene;
pub mod state;

pub use morphs::{ExpressionCategory, MorphBindings, MorphSlot};
pub use rig::RigBones;
pub use scene::{BoneTransform, MeshId, NodeId, RigManifest, Scene, SceneGraph};
pub use state::{ChatInput, FrameInput, SpeechFlags, TalkMode};
