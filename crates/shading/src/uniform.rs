use glam::Vec3;
use hatchlight_common::Color;

/// Semantic type of a uniform as declared by a program's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Vec3,
    Color,
    Scalar,
}

impl std::fmt::Display for UniformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vec3 => "vec3",
            Self::Color => "color",
            Self::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// A concrete uniform value, tagged with its semantic type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Vec3(Vec3),
    Color(Color),
    Scalar(f32),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Vec3(_) => UniformType::Vec3,
            Self::Color(_) => UniformType::Color,
            Self::Scalar(_) => UniformType::Scalar,
        }
    }

    /// Pack into one 16-byte `vec4<f32>` upload slot.
    pub fn to_slot(&self) -> [f32; 4] {
        match *self {
            Self::Vec3(v) => [v.x, v.y, v.z, 0.0],
            Self::Color(c) => [c.r, c.g, c.b, 1.0],
            Self::Scalar(s) => [s, 0.0, 0.0, 0.0],
        }
    }
}

/// One declared uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
}

/// Ordered uniform declarations of a shader program.
///
/// Order is significant: it is the slot order of the packed upload buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformSchema {
    decls: Vec<UniformDecl>,
}

impl UniformSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a uniform. Redeclaring a name changes its type but keeps its slot.
    pub fn with(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        let name = name.into();
        match self.decls.iter_mut().find(|d| d.name == name) {
            Some(existing) => existing.ty = ty,
            None => self.decls.push(UniformDecl { name, ty }),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<UniformType> {
        self.decls.iter().find(|d| d.name == name).map(|d| d.ty)
    }

    /// Slot index of a uniform.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.decls.iter().position(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniformDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_preserves_declaration_order() {
        let schema = UniformSchema::new()
            .with("uDirLightPos", UniformType::Vec3)
            .with("uLineColor0", UniformType::Color)
            .with("uIntensity", UniformType::Scalar);
        let names: Vec<&str> = schema.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["uDirLightPos", "uLineColor0", "uIntensity"]);
        assert_eq!(schema.position("uLineColor0"), Some(1));
    }

    #[test]
    fn redeclaring_keeps_slot() {
        let schema = UniformSchema::new()
            .with("a", UniformType::Vec3)
            .with("b", UniformType::Color)
            .with("a", UniformType::Scalar);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("a"), Some(UniformType::Scalar));
        assert_eq!(schema.position("a"), Some(0));
    }

    #[test]
    fn value_slots() {
        assert_eq!(
            UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)).to_slot(),
            [1.0, 2.0, 3.0, 0.0]
        );
        assert_eq!(
            UniformValue::Color(Color::new(0.5, 0.25, 0.0)).to_slot(),
            [0.5, 0.25, 0.0, 1.0]
        );
        assert_eq!(UniformValue::Scalar(4.0).ty(), UniformType::Scalar);
    }
}
