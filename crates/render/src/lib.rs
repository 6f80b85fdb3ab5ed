//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read node transforms; they never move nodes.
//! - The only scene state a renderer writes is the material upload marker.
//!
//! The GPU renderer lives in `hatchlight-render-wgpu`. [`DebugTextRenderer`]
//! implements the same trait as text output for headless runs and tests.

mod camera;
mod renderer;

pub use camera::PerspectiveCamera;
pub use renderer::{DebugTextRenderer, Renderer};
