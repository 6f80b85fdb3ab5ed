use glam::Vec3;
use hatchlight_common::{EulerTransform, GeometryId, MaterialId, NodeId, wrap_angle};
use hatchlight_shading::MaterialInstance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::geometry::Geometry;

/// Errors from scene operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("non-finite {field} {value:?}; keeping previous transform")]
    InvalidTransform { field: &'static str, value: Vec3 },
    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),
    #[error("geometry {0:?} not found")]
    GeometryNotFound(GeometryId),
    #[error("material {0:?} not found")]
    MaterialNotFound(MaterialId),
}

/// Structural changes to a scene, recorded in order for debugging.
///
/// Transform writes are not recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneEvent {
    GeometryAdded { id: GeometryId, name: String },
    MaterialAdded { id: MaterialId, name: String },
    NodeAdded { id: NodeId, transform: EulerTransform },
    NodeRemoved { id: NodeId, transform: EulerTransform },
    Cleared,
}

/// A positioned, oriented mesh: one geometry drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    name: String,
    geometry: GeometryId,
    material: MaterialId,
    transform: EulerTransform,
}

impl SceneNode {
    /// Create a detached node. Fails if `transform` has a non-finite component.
    pub fn new(
        name: impl Into<String>,
        geometry: GeometryId,
        material: MaterialId,
        transform: EulerTransform,
    ) -> Result<Self, SceneError> {
        check_finite("position", transform.position)?;
        check_finite("rotation", transform.rotation)?;
        check_finite("scale", transform.scale)?;
        Ok(Self {
            name: name.into(),
            geometry,
            material,
            transform,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> GeometryId {
        self.geometry
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn transform(&self) -> &EulerTransform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.transform.rotation
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), SceneError> {
        check_finite("position", position)?;
        self.transform.position = position;
        Ok(())
    }

    /// Set the Euler rotation. Angles are wrapped into `[-PI, PI]` so that a
    /// free-running rotation keeps full float precision over long runs.
    pub fn set_rotation(&mut self, rotation: Vec3) -> Result<(), SceneError> {
        check_finite("rotation", rotation)?;
        self.transform.rotation = Vec3::new(
            wrap_angle(rotation.x),
            wrap_angle(rotation.y),
            wrap_angle(rotation.z),
        );
        Ok(())
    }
}

fn check_finite(field: &'static str, value: Vec3) -> Result<(), SceneError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SceneError::InvalidTransform { field, value })
    }
}

/// Scene container.
///
/// Owns the nodes plus the geometry and material tables they reference.
/// Ids are allocated from one per-scene counter, so BTreeMap iteration is
/// insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<NodeId, SceneNode>,
    geometries: BTreeMap<GeometryId, Rc<Geometry>>,
    materials: BTreeMap<MaterialId, MaterialInstance>,
    next_id: u64,
    event_log: Vec<SceneEvent>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.allocate());
        self.event_log.push(SceneEvent::GeometryAdded {
            id,
            name: geometry.name.clone(),
        });
        self.geometries.insert(id, Rc::new(geometry));
        id
    }

    pub fn add_material(&mut self, material: MaterialInstance) -> MaterialId {
        let id = MaterialId(self.allocate());
        self.event_log.push(SceneEvent::MaterialAdded {
            id,
            name: material.name().to_string(),
        });
        self.materials.insert(id, material);
        id
    }

    /// Insert a node whose geometry and material are registered here.
    pub fn add(&mut self, node: SceneNode) -> Result<NodeId, SceneError> {
        if !self.geometries.contains_key(&node.geometry) {
            return Err(SceneError::GeometryNotFound(node.geometry));
        }
        if !self.materials.contains_key(&node.material) {
            return Err(SceneError::MaterialNotFound(node.material));
        }
        let id = NodeId(self.allocate());
        self.event_log.push(SceneEvent::NodeAdded {
            id,
            transform: node.transform,
        });
        tracing::debug!(node = %node.name, ?id, "node added");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Build and insert a node in one step.
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        geometry: GeometryId,
        material: MaterialId,
        transform: EulerTransform,
    ) -> Result<NodeId, SceneError> {
        let node = SceneNode::new(name, geometry, material, transform)?;
        self.add(node)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.remove(&id);
        if let Some(ref n) = node {
            self.event_log.push(SceneEvent::NodeRemoved {
                id,
                transform: n.transform,
            });
        }
        node
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_position(position)
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Vec3) -> Result<(), SceneError> {
        self.node_mut(id)?.set_rotation(rotation)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Rc<Geometry>> {
        self.geometries.get(&id)
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryId, &Rc<Geometry>)> {
        self.geometries.iter().map(|(id, g)| (*id, g))
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialInstance> {
        self.materials.get(&id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Result<&mut MaterialInstance, SceneError> {
        self.materials
            .get_mut(&id)
            .ok_or(SceneError::MaterialNotFound(id))
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &MaterialInstance)> {
        self.materials.iter().map(|(id, m)| (*id, m))
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = (MaterialId, &mut MaterialInstance)> {
        self.materials.iter_mut().map(|(id, m)| (*id, m))
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Drop every node, material and geometry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.materials.clear();
        self.geometries.clear();
        self.event_log.push(SceneEvent::Cleared);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.materials.is_empty() && self.geometries.is_empty()
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Deterministic hash of node transforms in traversal order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for (id, node) in &self.nodes {
            mix(&mut h, &id.0.to_le_bytes());
            mix(&mut h, &node.material.0.to_le_bytes());
            let t = &node.transform;
            for v in [t.position, t.rotation, t.scale] {
                for c in v.to_array() {
                    mix(&mut h, &c.to_le_bytes());
                }
            }
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use hatchlight_common::Color;
    use hatchlight_shading::{
        DirectionalLight, LightField, NagaBackend, ShaderProgramBinding, SharedLight,
        UniformSource, UniformValue, shaders,
    };

    fn material(light: &SharedLight) -> MaterialInstance {
        let binding = block_on(ShaderProgramBinding::compile(
            &NagaBackend,
            shaders::toon_hatch_source(),
            shaders::toon_hatch_schema(),
        ))
        .unwrap();
        let mut values = vec![
            (
                shaders::DIR_LIGHT_POS.to_string(),
                UniformSource::Light(light.downgrade(), LightField::Direction),
            ),
            (
                shaders::DIR_LIGHT_COLOR.to_string(),
                UniformSource::Light(light.downgrade(), LightField::Color),
            ),
            (
                shaders::AMBIENT_LIGHT_COLOR.to_string(),
                UniformValue::Color(Color::from_hex(0x050505)).into(),
            ),
            (
                shaders::BASE_COLOR.to_string(),
                UniformValue::Color(Color::BLACK).into(),
            ),
        ];
        for i in 0..shaders::LINE_COLOR_COUNT {
            values.push((shaders::line_color(i), UniformValue::Color(Color::WHITE).into()));
        }
        MaterialInstance::instantiate("plain", Rc::new(binding), values).unwrap()
    }

    fn populated() -> (Scene, GeometryId, MaterialId, SharedLight) {
        let light = SharedLight::new(DirectionalLight::default());
        let mut scene = Scene::new();
        let g = scene.add_geometry(Geometry::torus(1.0, 0.25, 8, 8));
        let m = scene.add_material(material(&light));
        (scene, g, m, light)
    }

    #[test]
    fn scene_starts_empty() {
        let scene = Scene::new();
        assert_eq!(scene.node_count(), 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn nodes_traverse_in_insertion_order() {
        let (mut scene, g, m, _light) = populated();
        let names = ["c", "a", "b"];
        for name in names {
            scene
                .create_node(name, g, m, EulerTransform::default())
                .unwrap();
        }
        let order: Vec<&str> = scene.nodes().map(|(_, n)| n.name()).collect();
        assert_eq!(order, names);
    }

    #[test]
    fn add_rejects_dangling_references() {
        let (mut scene, g, m, _light) = populated();
        let bad_geometry =
            SceneNode::new("x", GeometryId(999), m, EulerTransform::default()).unwrap();
        assert_eq!(
            scene.add(bad_geometry),
            Err(SceneError::GeometryNotFound(GeometryId(999)))
        );
        let bad_material =
            SceneNode::new("y", g, MaterialId(999), EulerTransform::default()).unwrap();
        assert_eq!(
            scene.add(bad_material),
            Err(SceneError::MaterialNotFound(MaterialId(999)))
        );
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn non_finite_creation_is_rejected() {
        let t = EulerTransform::from_position(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(matches!(
            SceneNode::new("n", GeometryId(1), MaterialId(2), t),
            Err(SceneError::InvalidTransform { field: "position", .. })
        ));
    }

    #[test]
    fn rejected_write_keeps_previous_transform() {
        let (mut scene, g, m, _light) = populated();
        let id = scene
            .create_node("n", g, m, EulerTransform::from_position(Vec3::new(1.0, 2.0, 3.0)))
            .unwrap();
        scene.set_rotation(id, Vec3::new(0.0, 0.5, 0.0)).unwrap();

        let err = scene.set_rotation(id, Vec3::new(0.0, f32::INFINITY, 0.0));
        assert!(matches!(err, Err(SceneError::InvalidTransform { field: "rotation", .. })));
        let err = scene.set_position(id, Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(err.is_err());

        let node = scene.node(id).unwrap();
        assert_eq!(node.rotation(), Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(node.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rotation_is_wrapped() {
        let (mut scene, g, m, _light) = populated();
        let id = scene.create_node("n", g, m, EulerTransform::default()).unwrap();
        scene.set_rotation(id, Vec3::new(0.0, 7.0, 0.0)).unwrap();
        let y = scene.node(id).unwrap().rotation().y;
        assert!((y - (7.0 - std::f32::consts::TAU)).abs() < 1e-5);
    }

    #[test]
    fn missing_node_is_reported() {
        let mut scene = Scene::new();
        assert_eq!(
            scene.set_rotation(NodeId(5), Vec3::ZERO),
            Err(SceneError::NodeNotFound(NodeId(5)))
        );
    }

    #[test]
    fn events_record_structure() {
        let (mut scene, g, m, _light) = populated();
        let id = scene.create_node("n", g, m, EulerTransform::default()).unwrap();
        scene.set_rotation(id, Vec3::Y).unwrap();
        scene.remove(id);
        // geometry + material + add + remove; rotation writes are not logged
        assert_eq!(scene.events().len(), 4);
        assert_eq!(scene.drain_events().len(), 4);
        assert!(scene.events().is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let (mut scene, g, m, _light) = populated();
        scene.create_node("n", g, m, EulerTransform::default()).unwrap();
        scene.clear();
        assert!(scene.is_empty());
        assert_eq!(scene.events().last(), Some(&SceneEvent::Cleared));
    }

    #[test]
    fn state_hash_tracks_transforms() {
        let (mut a, g, m, _la) = populated();
        let (mut b, _, _, _lb) = populated();
        let ia = a.create_node("n", g, m, EulerTransform::default()).unwrap();
        let ib = b.create_node("n", g, m, EulerTransform::default()).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
        a.set_rotation(ia, Vec3::Y).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.set_rotation(ib, Vec3::Y).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
