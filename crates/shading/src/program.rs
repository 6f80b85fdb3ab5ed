use std::future::Future;

use crate::uniform::UniformSchema;

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Vertex and fragment source text of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn stage(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

/// The backend rejected a shader stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shader program `{program}` failed to compile ({stage} stage): {message}")]
pub struct CompileError {
    pub program: String,
    pub stage: ShaderStage,
    pub message: String,
}

/// What a backend reports about a program it accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledProgram {
    /// Vertex entry point name, when the backend resolved it.
    pub vertex_entry: Option<String>,
    /// Fragment entry point name, when the backend resolved it.
    pub fragment_entry: Option<String>,
}

/// GPU-side shader compiler.
///
/// Compilation may suspend (e.g. waiting on a device error scope), which is
/// why this returns a future. Futures are not required to be `Send`: setup
/// runs on the frame thread.
pub trait ShaderBackend {
    fn compile(
        &self,
        source: &ShaderSource,
    ) -> impl Future<Output = Result<CompiledProgram, CompileError>>;
}

/// An accepted shader program plus the uniform schema its materials must satisfy.
///
/// Immutable after construction. Share it behind an `Rc`.
#[derive(Debug, Clone)]
pub struct ShaderProgramBinding {
    source: ShaderSource,
    schema: UniformSchema,
    compiled: CompiledProgram,
}

impl ShaderProgramBinding {
    /// Compile `source` with `backend` and attach `schema`.
    ///
    /// The schema is not checked against the source here; it is enforced
    /// when materials are instantiated.
    pub async fn compile<B: ShaderBackend>(
        backend: &B,
        source: ShaderSource,
        schema: UniformSchema,
    ) -> Result<Self, CompileError> {
        let compiled = backend.compile(&source).await?;
        tracing::debug!(
            program = %source.label,
            uniforms = schema.len(),
            "shader program compiled"
        );
        Ok(Self {
            source,
            schema,
            compiled,
        })
    }

    pub fn label(&self) -> &str {
        &self.source.label
    }

    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    pub fn schema(&self) -> &UniformSchema {
        &self.schema
    }

    pub fn compiled(&self) -> &CompiledProgram {
        &self.compiled
    }
}
