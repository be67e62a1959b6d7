//! A .bvh to DeepMimic humanoid motion file converter.
//!
//! Parses BVH motion-capture files, remaps a fixed 15-slot humanoid joint
//! list onto the bones of the source rig, converts Euler rotations to
//! quaternions with the DeepMimic per-joint corrections, and writes one
//! `{"Loop": "wrap", "Frames": [...]}` document per input file.

pub mod diagnostics;
pub mod error;
pub mod export;
pub mod parse;
pub mod retarget;
pub mod rig;
pub mod types;
