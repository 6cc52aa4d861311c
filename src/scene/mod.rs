//! Scene-side consumers of animation output.
//!
//! - Transform: TRS component with a cached local matrix and dirty check
//! - Rig: bone hierarchy that binds to an animator and receives its pose

pub mod rig;
pub mod transform;

pub use rig::{Bone, BoneHandle, Rig};
pub use transform::Transform;
