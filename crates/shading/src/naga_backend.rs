use crate::program::{CompileError, CompiledProgram, ShaderBackend, ShaderSource, ShaderStage};

/// Offline WGSL backend: parses and validates each stage with naga.
///
/// Used wherever no GPU device exists (headless runs, tests). Accepts a
/// program only if the vertex source has a `@vertex` entry point and the
/// fragment source has a `@fragment` entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct NagaBackend;

impl NagaBackend {
    pub fn new() -> Self {
        Self
    }

    fn check_stage(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
    ) -> Result<String, CompileError> {
        let text = source.stage(stage);
        let fail = |message: String| CompileError {
            program: source.label.clone(),
            stage,
            message,
        };

        let module = naga::front::wgsl::parse_str(text)
            .map_err(|e| fail(format!("WGSL parse error: {}", e.emit_to_string(text))))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| fail(format!("validation error: {e}")))?;

        let naga_stage = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        };
        module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga_stage)
            .map(|ep| ep.name.clone())
            .ok_or_else(|| fail(format!("no {stage} entry point")))
    }
}

impl ShaderBackend for NagaBackend {
    async fn compile(&self, source: &ShaderSource) -> Result<CompiledProgram, CompileError> {
        let vertex = self.check_stage(source, ShaderStage::Vertex)?;
        let fragment = self.check_stage(source, ShaderStage::Fragment)?;
        Ok(CompiledProgram {
            vertex_entry: Some(vertex),
            fragment_entry: Some(fragment),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders;
    use futures::executor::block_on;

    #[test]
    fn builtin_toon_program_validates() {
        let compiled = block_on(NagaBackend.compile(&shaders::toon_hatch_source())).unwrap();
        assert_eq!(compiled.vertex_entry.as_deref(), Some("vs_main"));
        assert_eq!(compiled.fragment_entry.as_deref(), Some("fs_main"));
    }

    #[test]
    fn syntax_error_is_reported_for_its_stage() {
        let source = ShaderSource::new(
            "bad",
            shaders::TOON_HATCH_VERTEX,
            "@fragment fn fs_main( -> @location(0) vec4<f32> { return vec4<f32>(1.0); }",
        );
        let err = block_on(NagaBackend.compile(&source)).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert_eq!(err.program, "bad");
    }

    #[test]
    fn missing_entry_point_is_rejected() {
        // A valid module whose "vertex" source only has a fragment entry point.
        let fragment_only =
            "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let source = ShaderSource::new("swapped", fragment_only, fragment_only);
        let err = block_on(NagaBackend.compile(&source)).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);
        assert!(err.message.contains("entry point"));
    }

    #[test]
    fn type_error_fails_validation() {
        let vertex = "@vertex fn vs_main() -> @builtin(position) vec4<f32> {
            let x: f32 = vec3<f32>(1.0);
            return vec4<f32>(x);
        }";
        let source = ShaderSource::new("typed", vertex, shaders::TOON_HATCH_FRAGMENT);
        let err = block_on(NagaBackend.compile(&source)).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);
    }
}
