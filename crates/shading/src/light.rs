use glam::Vec3;
use hatchlight_common::Color;
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Value of a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light arrives from (not required to be normalized).
    pub direction: Vec3,
    pub color: Color,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug)]
struct LightCell {
    value: Cell<DirectionalLight>,
    revision: Cell<u64>,
}

/// The single owner of a directional light.
///
/// Materials never hold this type. They hold a [`LightRef`] obtained from
/// [`SharedLight::downgrade`] and read the current value on demand, so moving
/// the light reaches every material without any propagation step.
///
/// Single-threaded by construction (`Rc`): all reads and writes happen on the
/// frame thread.
#[derive(Debug, Clone)]
pub struct SharedLight(Rc<LightCell>);

impl SharedLight {
    pub fn new(light: DirectionalLight) -> Self {
        Self(Rc::new(LightCell {
            value: Cell::new(light),
            revision: Cell::new(0),
        }))
    }

    pub fn get(&self) -> DirectionalLight {
        self.0.value.get()
    }

    pub fn set(&self, light: DirectionalLight) {
        self.0.value.set(light);
        self.0.revision.set(self.0.revision.get().wrapping_add(1));
    }

    pub fn set_direction(&self, direction: Vec3) {
        self.set(DirectionalLight {
            direction,
            ..self.get()
        });
    }

    pub fn set_color(&self, color: Color) {
        self.set(DirectionalLight {
            color,
            ..self.get()
        });
    }

    /// Bumped on every write.
    pub fn revision(&self) -> u64 {
        self.0.revision.get()
    }

    /// Read-only, non-owning view for materials.
    pub fn downgrade(&self) -> LightRef {
        LightRef(Rc::downgrade(&self.0))
    }
}

/// Non-owning read capability on a [`SharedLight`].
#[derive(Debug, Clone)]
pub struct LightRef(Weak<LightCell>);

impl LightRef {
    /// Current light value, or `None` once the owner has been dropped.
    pub fn read(&self) -> Option<DirectionalLight> {
        self.0.upgrade().map(|cell| cell.value.get())
    }

    pub fn revision(&self) -> Option<u64> {
        self.0.upgrade().map(|cell| cell.revision.get())
    }

    pub fn is_attached(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Which part of the light a uniform reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightField {
    Direction,
    Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_observe_writes() {
        let light = SharedLight::new(DirectionalLight::default());
        let a = light.downgrade();
        let b = light.downgrade();

        light.set_direction(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(a.read().map(|l| l.direction), Some(Vec3::X));
        assert_eq!(b.read().map(|l| l.direction), Some(Vec3::X));
    }

    #[test]
    fn revision_advances_per_write() {
        let light = SharedLight::new(DirectionalLight::default());
        let r = light.downgrade();
        assert_eq!(r.revision(), Some(0));
        light.set_color(Color::BLACK);
        light.set_direction(Vec3::Y);
        assert_eq!(r.revision(), Some(2));
    }

    #[test]
    fn refs_detach_when_owner_drops() {
        let light = SharedLight::new(DirectionalLight::default());
        let r = light.downgrade();
        assert!(r.is_attached());
        drop(light);
        assert!(!r.is_attached());
        assert!(r.read().is_none());
    }
}
