//! Shading: shader program bindings and the material instances that feed them.
//!
//! # Invariants
//! - A binding is immutable once compiled and may be shared by any number of materials.
//! - A material holds a value for every uniform its binding declares, and nothing else.
//! - Light-bound uniforms are resolved at read time; materials never copy the light.

mod light;
mod material;
mod naga_backend;
mod program;
pub mod shaders;
mod uniform;

pub use light::{DirectionalLight, LightField, LightRef, SharedLight};
pub use material::{MaterialError, MaterialInstance, MismatchReason, UniformSource};
pub use naga_backend::NagaBackend;
pub use program::{
    CompileError, CompiledProgram, ShaderBackend, ShaderProgramBinding, ShaderSource, ShaderStage,
};
pub use uniform::{UniformDecl, UniformSchema, UniformType, UniformValue};
