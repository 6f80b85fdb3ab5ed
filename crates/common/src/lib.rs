//! Shared value types used across the hatchlight crates.
//!
//! # Invariants
//! - Ids are allocated sequentially per owner, never from global state.
//! - Colors are stored in linear RGB.

mod types;

pub use types::{Color, EulerTransform, GeometryId, MaterialId, NodeId, wrap_angle};
