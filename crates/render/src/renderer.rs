use hatchlight_scene::Scene;

use crate::camera::PerspectiveCamera;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads node transforms and resolved material uniforms. The
/// scene is borrowed mutably only so uploaded materials can be marked clean.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` as seen from `camera`.
    fn render(&mut self, scene: &mut Scene, camera: &PerspectiveCamera) -> Self::Output;

    /// Surface size changed.
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// Text renderer for headless runs and tests.
///
/// Prints one line per node and counts material uploads, so the dirty
/// tracking of material instances is observable without a GPU.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames: u64,
    uploads: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Total material uploads across all frames.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &mut Scene, camera: &PerspectiveCamera) -> String {
        let mut uploaded = Vec::new();
        for (id, material) in scene.materials_mut() {
            if !material.needs_upload() {
                continue;
            }
            match material.pack_slots() {
                Ok(_) => {
                    material.mark_uploaded();
                    uploaded.push(id);
                }
                Err(err) => tracing::warn!(%err, ?id, "material upload skipped"),
            }
        }
        self.uploads += uploaded.len() as u64;
        self.frames += 1;

        let mut out = String::new();
        out.push_str(&format!(
            "=== Frame {} (nodes={}, materials={}, uploads={}) ===\n",
            self.frames,
            scene.node_count(),
            scene.material_count(),
            uploaded.len()
        ));
        let (eye, target) = (camera.position, camera.target);
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) \
             fov={:.0} aspect={:.2}\n",
            eye.x, eye.y, eye.z, target.x, target.y, target.z, camera.fov_degrees, camera.aspect
        ));

        for (id, node) in scene.nodes() {
            let material = scene.material(node.material()).map_or("?", |m| m.name());
            let p = node.position();
            let r = node.rotation();
            out.push_str(&format!(
                "  [{}] {} mat={} pos=({:.2}, {:.2}, {:.2}) rot=({:.4}, {:.4}, {:.4})\n",
                id.0,
                node.name(),
                material,
                p.x,
                p.y,
                p.z,
                r.x,
                r.y,
                r.z
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use glam::Vec3;
    use hatchlight_common::{Color, EulerTransform};
    use hatchlight_scene::Geometry;
    use hatchlight_shading::shaders::{self, toon_hatch_schema, toon_hatch_source};
    use hatchlight_shading::{
        DirectionalLight, LightField, MaterialInstance, NagaBackend, ShaderProgramBinding,
        SharedLight, UniformSource, UniformValue,
    };
    use std::rc::Rc;

    fn toon(light: &SharedLight, name: &str) -> MaterialInstance {
        let binding = block_on(ShaderProgramBinding::compile(
            &NagaBackend::new(),
            toon_hatch_source(),
            toon_hatch_schema(),
        ))
        .unwrap();
        let color = |hex| UniformSource::from(UniformValue::Color(Color::from_hex(hex)));
        let mut initial = vec![
            (
                shaders::DIR_LIGHT_POS.to_string(),
                UniformSource::Light(light.downgrade(), LightField::Direction),
            ),
            (
                shaders::DIR_LIGHT_COLOR.to_string(),
                UniformSource::Light(light.downgrade(), LightField::Color),
            ),
            (shaders::AMBIENT_LIGHT_COLOR.to_string(), color(0x050505)),
            (shaders::BASE_COLOR.to_string(), color(0x000000)),
        ];
        for i in 0..shaders::LINE_COLOR_COUNT {
            initial.push((shaders::line_color(i), color(0xff0000)));
        }
        MaterialInstance::instantiate(name, Rc::new(binding), initial).unwrap()
    }

    #[test]
    fn debug_renderer_empty_scene() {
        let mut scene = Scene::new();
        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&mut scene, &PerspectiveCamera::default());

        assert!(output.contains("Frame 1"));
        assert!(output.contains("nodes=0"));
        assert!(output.contains("fov=50"));
    }

    #[test]
    fn debug_renderer_writes_one_line_per_entry() {
        let mut scene = Scene::new();
        let output = DebugTextRenderer::new().render(&mut scene, &PerspectiveCamera::default());

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("=== Frame 1"));
        assert!(lines[1].starts_with("Camera: eye="));
        assert!(lines[1].contains(") fov=50 aspect="));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn debug_renderer_lists_nodes() {
        let light = SharedLight::new(DirectionalLight::default());
        let mut scene = Scene::new();
        let geometry = scene.add_geometry(Geometry::torus(250.0, 100.0, 8, 8));
        let material = scene.add_material(toon(&light, "red"));
        scene
            .create_node(
                "torus_a",
                geometry,
                material,
                EulerTransform::from_position(Vec3::new(-300.0, 0.0, -1000.0)),
            )
            .unwrap();

        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&mut scene, &PerspectiveCamera::default());
        assert!(output.contains("nodes=1"));
        assert!(output.contains("torus_a mat=red pos=(-300.00, 0.00, -1000.00)"));
    }

    #[test]
    fn uploads_only_when_material_changes() {
        let light = SharedLight::new(DirectionalLight::default());
        let mut scene = Scene::new();
        let material = scene.add_material(toon(&light, "red"));
        let camera = PerspectiveCamera::default();
        let mut renderer = DebugTextRenderer::new();

        assert!(renderer.render(&mut scene, &camera).contains("uploads=1"));
        assert!(renderer.render(&mut scene, &camera).contains("uploads=0"));

        light.set_direction(Vec3::new(0.0, 1.0, 0.0));
        assert!(renderer.render(&mut scene, &camera).contains("uploads=1"));

        scene
            .material_mut(material)
            .unwrap()
            .set_uniform(&shaders::line_color(0), UniformValue::Color(Color::WHITE))
            .unwrap();
        assert!(renderer.render(&mut scene, &camera).contains("uploads=1"));
        assert_eq!(renderer.uploads(), 3);
        assert_eq!(renderer.frames(), 4);
    }
}
