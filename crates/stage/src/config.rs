//! Stage configuration.
//!
//! Everything the lifecycle controller builds during setup is described here.
//! Every field has a default, so an empty YAML document is a valid config
//! that reproduces the stock two-torus stage.

use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::path::Path;

use glam::Vec3;
use hatchlight_common::Color;
use hatchlight_scene::Geometry;
use hatchlight_shading::shaders::{self, LINE_COLOR_COUNT};
use serde::{Deserialize, Serialize};

use crate::driver::DriverConfig;

/// Errors from loading or validating a [`StageConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A `0xRRGGBB` color. Accepts an integer or a `"#rrggbb"` / `"0xrrggbb"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HexRepr", into = "u32")]
pub struct HexColor(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum HexRepr {
    Int(u32),
    Text(String),
}

impl TryFrom<HexRepr> for HexColor {
    type Error = String;

    fn try_from(repr: HexRepr) -> Result<Self, Self::Error> {
        let value = match repr {
            HexRepr::Int(v) => v,
            HexRepr::Text(text) => {
                let digits = text
                    .strip_prefix('#')
                    .or_else(|| text.strip_prefix("0x"))
                    .unwrap_or(&text);
                u32::from_str_radix(digits, 16).map_err(|e| format!("bad color `{text}`: {e}"))?
            }
        };
        if value > 0xff_ffff {
            return Err(format!("color {value:#x} has more than 24 bits"));
        }
        Ok(Self(value))
    }
}

impl From<HexColor> for u32 {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl HexColor {
    pub fn to_color(self) -> Color {
        Color::from_hex(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    /// Point the orbit controls circle around.
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 50.0,
            near: 1.0,
            far: 10_000.0,
            position: Vec3::ZERO,
            target: Vec3::new(0.0, 0.0, -1000.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 1.0,
            max_distance: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub direction: Vec3,
    pub color: HexColor,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            color: HexColor(0xffffff),
        }
    }
}

/// Hatch line colors of one material variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    pub line_colors: Vec<HexColor>,
}

impl PaletteConfig {
    /// `primary` for the first four lines, `accent` for the darkest one.
    pub fn with_accent(primary: u32, accent: u32) -> Self {
        let mut line_colors = vec![HexColor(primary); LINE_COLOR_COUNT - 1];
        line_colors.push(HexColor(accent));
        Self { line_colors }
    }
}

/// Inline WGSL program. Its `Material` block must follow the built-in layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    pub vertex: String,
    pub fragment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorusConfig {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusConfig {
    fn default() -> Self {
        Self {
            radius: 250.0,
            tube: 100.0,
            radial_segments: 32,
            tubular_segments: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub palette: String,
    /// Key into [`StageConfig::shaders`]; the built-in program when absent.
    #[serde(default)]
    pub shader: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    /// Angular rate in radians per second about each axis.
    #[serde(default)]
    pub spin: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub light: LightConfig,
    pub ambient: HexColor,
    pub base_color: HexColor,
    pub palettes: BTreeMap<String, PaletteConfig>,
    pub shaders: BTreeMap<String, ShaderConfig>,
    pub torus: TorusConfig,
    pub nodes: Vec<NodeConfig>,
    pub driver: DriverConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        let spin = PI / 32.0;
        Self {
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            light: LightConfig::default(),
            ambient: HexColor(0x050505),
            base_color: HexColor(0x000000),
            palettes: BTreeMap::from([
                ("red".to_string(), PaletteConfig::with_accent(0xff0000, 0xffff00)),
                ("blue".to_string(), PaletteConfig::with_accent(0x0000ff, 0x00ffff)),
            ]),
            shaders: BTreeMap::new(),
            torus: TorusConfig::default(),
            nodes: vec![
                NodeConfig {
                    name: "torus_red".into(),
                    palette: "red".into(),
                    shader: None,
                    position: Vec3::new(-300.0, 0.0, -1000.0),
                    rotation: Vec3::ZERO,
                    spin: Vec3::new(0.0, spin, 0.0),
                },
                NodeConfig {
                    name: "torus_blue".into(),
                    palette: "blue".into(),
                    shader: None,
                    position: Vec3::new(300.0, 0.0, -1000.0),
                    rotation: Vec3::ZERO,
                    spin: Vec3::new(0.0, -spin, 0.0),
                },
            ],
            driver: DriverConfig::default(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn finite_vec(field: &str, v: Vec3) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{field} is not finite: {v}")))
    }
}

fn positive(field: &str, v: f32) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{field} must be positive, got {v}")))
    }
}

impl StageConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            nodes = config.nodes.len(),
            "stage config loaded"
        );
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        positive("camera.fov_degrees", camera.fov_degrees)?;
        if camera.fov_degrees >= 180.0 {
            return Err(invalid("camera.fov_degrees must be below 180"));
        }
        positive("camera.near", camera.near)?;
        if !(camera.far.is_finite() && camera.far > camera.near) {
            return Err(invalid("camera.far must be finite and greater than camera.near"));
        }
        finite_vec("camera.position", camera.position)?;
        finite_vec("camera.target", camera.target)?;

        let controls = &self.controls;
        if !(controls.damping_factor > 0.0 && controls.damping_factor <= 1.0) {
            return Err(invalid(format!(
                "controls.damping_factor must be in (0, 1], got {}",
                controls.damping_factor
            )));
        }
        positive("controls.rotate_speed", controls.rotate_speed)?;
        positive("controls.zoom_speed", controls.zoom_speed)?;
        if !(controls.min_distance >= 0.0 && controls.min_distance <= controls.max_distance) {
            return Err(invalid("controls.min_distance must be within [0, max_distance]"));
        }

        finite_vec("light.direction", self.light.direction)?;

        positive("torus.radius", self.torus.radius)?;
        positive("torus.tube", self.torus.tube)?;
        for (field, segments) in [
            ("torus.radial_segments", self.torus.radial_segments),
            ("torus.tubular_segments", self.torus.tubular_segments),
        ] {
            if segments > Geometry::MAX_SEGMENTS {
                return Err(invalid(format!(
                    "{field} must be at most {}, got {segments}",
                    Geometry::MAX_SEGMENTS
                )));
            }
        }

        for (name, palette) in &self.palettes {
            if palette.line_colors.len() != LINE_COLOR_COUNT {
                return Err(invalid(format!(
                    "palette `{name}` has {} line colors, expected {LINE_COLOR_COUNT}",
                    palette.line_colors.len()
                )));
            }
        }

        if self.shaders.contains_key(shaders::TOON_HATCH_LABEL) {
            return Err(invalid(format!(
                "shader name `{}` is reserved for the built-in program",
                shaders::TOON_HATCH_LABEL
            )));
        }

        if self.nodes.is_empty() {
            return Err(invalid("no nodes configured"));
        }
        for node in &self.nodes {
            if !self.palettes.contains_key(&node.palette) {
                return Err(invalid(format!(
                    "node `{}` references unknown palette `{}`",
                    node.name, node.palette
                )));
            }
            if let Some(shader) = &node.shader {
                if !self.shaders.contains_key(shader) {
                    return Err(invalid(format!(
                        "node `{}` references unknown shader `{shader}`",
                        node.name
                    )));
                }
            }
            finite_vec(&format!("nodes.{}.position", node.name), node.position)?;
            finite_vec(&format!("nodes.{}.rotation", node.name), node.rotation)?;
            finite_vec(&format!("nodes.{}.spin", node.name), node.spin)?;
        }

        let driver = &self.driver;
        if !(driver.min_interval.is_finite() && driver.min_interval >= 0.0) {
            return Err(invalid("driver.min_interval must be finite and non-negative"));
        }
        if !(driver.max_interval.is_finite() && driver.max_interval > 0.0) {
            return Err(invalid("driver.max_interval must be finite and positive"));
        }
        if driver.min_interval > driver.max_interval {
            return Err(invalid("driver.min_interval exceeds driver.max_interval"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = StageConfig::default();
        config.validate().unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].spin.y, -config.nodes[1].spin.y);
        assert!((config.driver.max_interval - 1.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn default_palettes_keep_duplicate_line_colors() {
        let config = StageConfig::default();
        let red = &config.palettes["red"].line_colors;
        assert_eq!(red[..4], [HexColor(0xff0000); 4]);
        assert_eq!(red[4], HexColor(0xffff00));
        let blue = &config.palettes["blue"].line_colors;
        assert_eq!(blue[..4], [HexColor(0x0000ff); 4]);
        assert_eq!(blue[4], HexColor(0x00ffff));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = StageConfig::from_yaml("{}").unwrap();
        assert_eq!(config, StageConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let yaml = r##"
camera:
  fov_degrees: 70
light:
  color: "#ff8800"
ambient: "0x101010"
"##;
        let config = StageConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.camera.fov_degrees, 70.0);
        assert_eq!(config.camera.near, 1.0);
        assert_eq!(config.light.color, HexColor(0xff8800));
        assert_eq!(config.ambient, HexColor(0x101010));
    }

    #[test]
    fn hex_color_accepts_int_and_strings() {
        let parse = |s: &str| serde_yaml::from_str::<HexColor>(s);
        assert_eq!(parse("16711680").unwrap(), HexColor(0xff0000));
        assert_eq!(parse("\"#00ff00\"").unwrap(), HexColor(0x00ff00));
        assert_eq!(parse("\"0x0000ff\"").unwrap(), HexColor(0x0000ff));
        assert!(parse("\"#zzzzzz\"").is_err());
        assert!(parse("\"#1000000\"").is_err());
    }

    #[test]
    fn unknown_palette_is_rejected() {
        let mut config = StageConfig::default();
        config.nodes[0].palette = "green".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown palette `green`"));
    }

    #[test]
    fn empty_node_list_is_rejected() {
        let mut config = StageConfig::default();
        config.nodes.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn inverted_driver_bounds_are_rejected() {
        let mut config = StageConfig::default();
        config.driver.min_interval = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let mut config = StageConfig::default();
        config.nodes[1].position.x = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_torus_is_rejected() {
        let mut config = StageConfig::default();
        config.torus.radial_segments = 100_000;
        config.torus.tubular_segments = 100_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("torus.radial_segments"));

        config.torus.radial_segments = Geometry::MAX_SEGMENTS;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("torus.tubular_segments"));

        config.torus.tubular_segments = Geometry::MAX_SEGMENTS;
        config.validate().unwrap();
    }

    #[test]
    fn short_palette_is_rejected() {
        let mut config = StageConfig::default();
        config.palettes.insert(
            "short".into(),
            PaletteConfig {
                line_colors: vec![HexColor(0xffffff)],
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "torus:\n  radius: 120\nnodes:\n  - name: solo\n    palette: red").unwrap();
        let config = StageConfig::load(file.path()).unwrap();
        assert_eq!(config.torus.radius, 120.0);
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].spin, Vec3::ZERO);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StageConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let config = StageConfig::default();
        let text = config.to_yaml().unwrap();
        assert_eq!(StageConfig::from_yaml(&text).unwrap(), config);
    }
}
