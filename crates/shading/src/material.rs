use std::rc::Rc;

use crate::light::{LightField, LightRef};
use crate::program::ShaderProgramBinding;
use crate::uniform::{UniformType, UniformValue};

/// Why a uniform assignment does not conform to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    Missing,
    WrongType { expected: UniformType, found: UniformType },
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => f.write_str("no value supplied"),
            Self::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
        }
    }
}

/// Errors from material construction and uniform access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error("material `{material}`: uniform `{uniform}` does not match schema: {reason}")]
    SchemaMismatch {
        material: String,
        uniform: String,
        reason: MismatchReason,
    },
    #[error("material `{material}`: unknown uniform `{uniform}`")]
    UnknownUniform { material: String, uniform: String },
    #[error("material `{material}`: uniform `{uniform}` reads a light that no longer exists")]
    DetachedLight { material: String, uniform: String },
}

/// Where a uniform's value comes from.
#[derive(Debug, Clone)]
pub enum UniformSource {
    /// A value owned by the material.
    Value(UniformValue),
    /// A live view of a shared light, looked up on every read.
    Light(LightRef, LightField),
}

impl UniformSource {
    fn ty(&self) -> UniformType {
        match self {
            Self::Value(v) => v.ty(),
            Self::Light(_, LightField::Direction) => UniformType::Vec3,
            Self::Light(_, LightField::Color) => UniformType::Color,
        }
    }
}

impl From<UniformValue> for UniformSource {
    fn from(value: UniformValue) -> Self {
        Self::Value(value)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    source: UniformSource,
    /// Light revision at the last upload (light-bound slots only).
    uploaded_revision: Option<u64>,
}

/// One program plus a complete, schema-checked set of uniform values.
///
/// Several instances can share a binding (e.g. a red and a blue variant of
/// the same program). Writes mark the instance dirty; the renderer uploads
/// the packed slots and calls [`MaterialInstance::mark_uploaded`]. Last
/// write before the upload wins.
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    name: String,
    binding: Rc<ShaderProgramBinding>,
    slots: Vec<Slot>,
    dirty: bool,
}

impl MaterialInstance {
    /// Bind `binding` to `initial` values.
    ///
    /// Every declared uniform needs a value of the declared type. Names the
    /// schema does not declare are rejected as unknown.
    pub fn instantiate<N, I>(
        name: impl Into<String>,
        binding: Rc<ShaderProgramBinding>,
        initial: I,
    ) -> Result<Self, MaterialError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, UniformSource)>,
    {
        let name = name.into();
        let schema = binding.schema();
        let mut assigned: Vec<Option<UniformSource>> = vec![None; schema.len()];

        for (uniform, source) in initial {
            let uniform = uniform.into();
            let Some(index) = schema.position(&uniform) else {
                return Err(MaterialError::UnknownUniform {
                    material: name,
                    uniform,
                });
            };
            let expected = schema.iter().nth(index).map(|d| d.ty);
            let found = source.ty();
            if let Some(expected) = expected.filter(|ty| *ty != found) {
                return Err(MaterialError::SchemaMismatch {
                    material: name,
                    uniform,
                    reason: MismatchReason::WrongType { expected, found },
                });
            }
            assigned[index] = Some(source);
        }

        let mut slots = Vec::with_capacity(assigned.len());
        for (decl, source) in schema.iter().zip(assigned) {
            let Some(source) = source else {
                return Err(MaterialError::SchemaMismatch {
                    material: name,
                    uniform: decl.name.clone(),
                    reason: MismatchReason::Missing,
                });
            };
            slots.push(Slot {
                source,
                uploaded_revision: None,
            });
        }

        Ok(Self {
            name,
            binding,
            slots,
            dirty: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> &Rc<ShaderProgramBinding> {
        &self.binding
    }

    fn slot_index(&self, uniform: &str) -> Result<usize, MaterialError> {
        self.binding
            .schema()
            .position(uniform)
            .ok_or_else(|| MaterialError::UnknownUniform {
                material: self.name.clone(),
                uniform: uniform.to_string(),
            })
    }

    /// Replace a uniform with an owned value.
    ///
    /// Fails without touching any state if the name is unknown or the value
    /// has the wrong type. A light-bound uniform stops following the light.
    pub fn set_uniform(&mut self, uniform: &str, value: UniformValue) -> Result<(), MaterialError> {
        self.rebind(uniform, UniformSource::Value(value))
    }

    /// Point a uniform at a shared light.
    pub fn bind_light(
        &mut self,
        uniform: &str,
        light: LightRef,
        field: LightField,
    ) -> Result<(), MaterialError> {
        self.rebind(uniform, UniformSource::Light(light, field))
    }

    fn rebind(&mut self, uniform: &str, source: UniformSource) -> Result<(), MaterialError> {
        let index = self.slot_index(uniform)?;
        let found = source.ty();
        let expected = self.slots[index].source.ty();
        if expected != found {
            return Err(MaterialError::SchemaMismatch {
                material: self.name.clone(),
                uniform: uniform.to_string(),
                reason: MismatchReason::WrongType { expected, found },
            });
        }
        self.slots[index] = Slot {
            source,
            uploaded_revision: None,
        };
        self.dirty = true;
        Ok(())
    }

    /// Current value of a uniform, resolving light-bound uniforms now.
    pub fn get_uniform(&self, uniform: &str) -> Result<UniformValue, MaterialError> {
        let index = self.slot_index(uniform)?;
        self.resolve(index, uniform)
    }

    fn resolve(&self, index: usize, uniform: &str) -> Result<UniformValue, MaterialError> {
        match &self.slots[index].source {
            UniformSource::Value(value) => Ok(*value),
            UniformSource::Light(light, field) => {
                let light = light.read().ok_or_else(|| MaterialError::DetachedLight {
                    material: self.name.clone(),
                    uniform: uniform.to_string(),
                })?;
                Ok(match field {
                    LightField::Direction => UniformValue::Vec3(light.direction),
                    LightField::Color => UniformValue::Color(light.color),
                })
            }
        }
    }

    /// True if anything changed since the last upload, including a moved light.
    pub fn needs_upload(&self) -> bool {
        self.dirty
            || self.slots.iter().any(|slot| match &slot.source {
                UniformSource::Light(light, _) => light.revision() != slot.uploaded_revision,
                UniformSource::Value(_) => false,
            })
    }

    /// Record that the renderer has consumed the current values.
    pub fn mark_uploaded(&mut self) {
        for slot in &mut self.slots {
            if let UniformSource::Light(light, _) = &slot.source {
                slot.uploaded_revision = light.revision();
            }
        }
        self.dirty = false;
    }

    /// Resolved values packed as one `vec4<f32>` per uniform, in schema order.
    pub fn pack_slots(&self) -> Result<Vec<[f32; 4]>, MaterialError> {
        self.binding
            .schema()
            .iter()
            .enumerate()
            .map(|(index, decl)| self.resolve(index, &decl.name).map(|v| v.to_slot()))
            .collect()
    }

    /// All uniforms with their resolved values, in schema order.
    pub fn uniforms(
        &self,
    ) -> impl Iterator<Item = (&str, Result<UniformValue, MaterialError>)> + '_ {
        self.binding
            .schema()
            .iter()
            .enumerate()
            .map(|(index, decl)| (decl.name.as_str(), self.resolve(index, &decl.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{DirectionalLight, SharedLight};
    use crate::program::{CompileError, CompiledProgram, ShaderBackend, ShaderSource};
    use crate::uniform::UniformSchema;
    use futures::executor::block_on;
    use glam::Vec3;
    use hatchlight_common::Color;

    struct AcceptAll;

    impl ShaderBackend for AcceptAll {
        async fn compile(&self, _source: &ShaderSource) -> Result<CompiledProgram, CompileError> {
            Ok(CompiledProgram::default())
        }
    }

    fn binding() -> Rc<ShaderProgramBinding> {
        let schema = UniformSchema::new()
            .with("uDirLightPos", UniformType::Vec3)
            .with("uLineColor0", UniformType::Color);
        let source = ShaderSource::new("test", "", "");
        Rc::new(block_on(ShaderProgramBinding::compile(&AcceptAll, source, schema)).unwrap())
    }

    fn colored(light: &SharedLight, hex: u32) -> MaterialInstance {
        colored_with(binding(), light, hex)
    }

    fn colored_with(
        program: Rc<ShaderProgramBinding>,
        light: &SharedLight,
        hex: u32,
    ) -> MaterialInstance {
        MaterialInstance::instantiate(
            format!("line_{hex:06x}"),
            program,
            [
                ("uDirLightPos", UniformSource::Light(light.downgrade(), LightField::Direction)),
                ("uLineColor0", UniformValue::Color(Color::from_hex(hex)).into()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn variants_share_program_with_distinct_values() {
        let light = SharedLight::new(DirectionalLight::default());
        let program = binding();
        let red = colored_with(program.clone(), &light, 0xff0000);
        let blue = colored_with(program.clone(), &light, 0x0000ff);
        assert!(Rc::ptr_eq(red.binding(), blue.binding()));
        assert_eq!(Rc::strong_count(&program), 3);
        assert_ne!(
            red.get_uniform("uLineColor0").unwrap(),
            blue.get_uniform("uLineColor0").unwrap()
        );
    }

    #[test]
    fn missing_uniform_is_schema_mismatch() {
        let err = MaterialInstance::instantiate(
            "partial",
            binding(),
            [("uDirLightPos", UniformSource::Value(UniformValue::Vec3(Vec3::Z)))],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MaterialError::SchemaMismatch {
                material: "partial".into(),
                uniform: "uLineColor0".into(),
                reason: MismatchReason::Missing,
            }
        );
    }

    #[test]
    fn wrong_type_is_schema_mismatch() {
        let err = MaterialInstance::instantiate(
            "typed",
            binding(),
            [
                ("uDirLightPos", UniformSource::Value(UniformValue::Scalar(1.0))),
                ("uLineColor0", UniformSource::Value(UniformValue::Color(Color::WHITE))),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MaterialError::SchemaMismatch {
                reason: MismatchReason::WrongType {
                    expected: UniformType::Vec3,
                    found: UniformType::Scalar
                },
                ..
            }
        ));
    }

    #[test]
    fn extra_uniform_is_unknown() {
        let err = MaterialInstance::instantiate(
            "extra",
            binding(),
            [
                ("uDirLightPos", UniformSource::Value(UniformValue::Vec3(Vec3::Z))),
                ("uLineColor0", UniformSource::Value(UniformValue::Color(Color::WHITE))),
                ("uLineColor9", UniformSource::Value(UniformValue::Color(Color::WHITE))),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MaterialError::UnknownUniform { .. }));
    }

    #[test]
    fn unknown_set_uniform_leaves_state_untouched() {
        let light = SharedLight::new(DirectionalLight::default());
        let mut m = colored(&light, 0xff0000);
        m.mark_uploaded();
        let before = m.pack_slots().unwrap();

        let err = m
            .set_uniform("uNope", UniformValue::Color(Color::BLACK))
            .unwrap_err();
        assert!(matches!(err, MaterialError::UnknownUniform { .. }));
        assert_eq!(m.pack_slots().unwrap(), before);
        assert!(!m.needs_upload());
    }

    #[test]
    fn set_uniform_last_write_wins_and_marks_dirty() {
        let light = SharedLight::new(DirectionalLight::default());
        let mut m = colored(&light, 0xff0000);
        m.mark_uploaded();
        m.set_uniform("uLineColor0", UniformValue::Color(Color::BLACK)).unwrap();
        m.set_uniform("uLineColor0", UniformValue::Color(Color::WHITE)).unwrap();
        assert!(m.needs_upload());
        assert_eq!(
            m.get_uniform("uLineColor0").unwrap(),
            UniformValue::Color(Color::WHITE)
        );
    }

    #[test]
    fn moving_light_reaches_every_material() {
        let light = SharedLight::new(DirectionalLight::default());
        let mut a = colored(&light, 0xff0000);
        let mut b = colored(&light, 0x0000ff);
        a.mark_uploaded();
        b.mark_uploaded();

        light.set_direction(Vec3::new(0.0, 1.0, 0.0));
        for m in [&a, &b] {
            assert!(m.needs_upload());
            assert_eq!(m.get_uniform("uDirLightPos").unwrap(), UniformValue::Vec3(Vec3::Y));
        }
        a.mark_uploaded();
        assert!(!a.needs_upload());
    }

    #[test]
    fn detached_light_is_reported() {
        let light = SharedLight::new(DirectionalLight::default());
        let m = colored(&light, 0xff0000);
        drop(light);
        assert!(matches!(
            m.get_uniform("uDirLightPos"),
            Err(MaterialError::DetachedLight { .. })
        ));
        assert!(m.pack_slots().is_err());
    }

    #[test]
    fn pack_slots_follows_schema_order() {
        let light = SharedLight::new(DirectionalLight {
            direction: Vec3::new(0.0, 0.0, 1.0),
            color: Color::WHITE,
        });
        let m = colored(&light, 0xff0000);
        let slots = m.pack_slots().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(slots[1][3], 1.0);
    }
}
