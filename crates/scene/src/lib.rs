//! Scene graph: nodes, the geometry they draw and the materials they shade with.
//!
//! # Invariants
//! - Nodes only reference geometry and materials registered with the same scene.
//! - A rejected transform write leaves the previous transform in place.
//! - Traversal order is insertion order; draw order belongs to the renderer.

pub mod geometry;
pub mod scene;

pub use geometry::Geometry;
pub use scene::{Scene, SceneError, SceneEvent, SceneNode};
