//! wgpu render backend.
//!
//! Draws every scene node with the pipeline of its material's program.
//! Bind groups follow the built-in program layout: 0 = camera,
//! 1 = node transform, 2 = packed material uniforms.
//!
//! # Invariants
//! - Renderer never moves nodes.
//! - Material buffers are written only when the instance reports `needs_upload`.
//! - GPU resources for removed nodes, geometries and materials are dropped on the next frame.

mod backend;
mod gpu;

pub use backend::WgpuShaderBackend;
pub use gpu::WgpuRenderer;
