use std::sync::Arc;

use hatchlight_shading::{CompileError, CompiledProgram, ShaderBackend, ShaderSource, ShaderStage};

/// Compiles shader programs on a wgpu device.
///
/// Each stage is created inside its own validation error scope so a failure
/// is attributed to the stage that caused it.
#[derive(Debug, Clone)]
pub struct WgpuShaderBackend {
    device: Arc<wgpu::Device>,
}

impl WgpuShaderBackend {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }

    async fn check_stage(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<(), CompileError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let _module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_{stage}", source.label)),
            source: wgpu::ShaderSource::Wgsl(source.stage(stage).into()),
        });
        match self.device.pop_error_scope().await {
            None => Ok(()),
            Some(err) => Err(CompileError {
                program: source.label.clone(),
                stage,
                message: err.to_string(),
            }),
        }
    }
}

impl ShaderBackend for WgpuShaderBackend {
    async fn compile(&self, source: &ShaderSource) -> Result<CompiledProgram, CompileError> {
        self.check_stage(source, ShaderStage::Vertex).await?;
        self.check_stage(source, ShaderStage::Fragment).await?;
        // wgpu picks the single entry point of each module.
        Ok(CompiledProgram::default())
    }
}
