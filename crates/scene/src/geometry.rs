use glam::Vec3;
use std::f32::consts::TAU;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Upper bound on either torus segment count. Keeps every index within `u32`.
    pub const MAX_SEGMENTS: u32 = 4096;

    /// Torus lying in the XY plane around the Z axis.
    ///
    /// `radius` is the distance from the center to the middle of the tube,
    /// `tube` the tube radius. Produces `(radial + 1) * (tubular + 1)`
    /// vertices (seam vertices are duplicated) and `6 * radial * tubular`
    /// indices. Segment counts are clamped to `[2, MAX_SEGMENTS]` and
    /// `[3, MAX_SEGMENTS]`.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.clamp(2, Self::MAX_SEGMENTS);
        let tubular = tubular_segments.clamp(3, Self::MAX_SEGMENTS);
        let vertex_count = (radial as usize + 1) * (tubular as usize + 1);

        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - center).normalize_or_zero();

                positions.push(position.to_array());
                normals.push(normal.to_array());
            }
        }

        let mut indices = Vec::with_capacity(6 * radial as usize * tubular as usize);
        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            name: "torus".into(),
            positions,
            normals,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torus_counts() {
        let g = Geometry::torus(250.0, 100.0, 32, 64);
        assert_eq!(g.vertex_count(), 33 * 65);
        assert_eq!(g.normals.len(), g.vertex_count());
        assert_eq!(g.index_count(), 6 * 32 * 64);
    }

    #[test]
    fn torus_indices_in_range() {
        let g = Geometry::torus(1.0, 0.25, 8, 12);
        let n = g.vertex_count() as u32;
        assert!(g.indices.iter().all(|&i| i < n));
    }

    #[test]
    fn torus_vertices_lie_on_tube() {
        let (radius, tube) = (250.0_f32, 100.0_f32);
        let g = Geometry::torus(radius, tube, 16, 24);
        for p in &g.positions {
            let p = Vec3::from_array(*p);
            let ring = Vec3::new(p.x, p.y, 0.0).normalize() * radius;
            assert!(((p - ring).length() - tube).abs() < 1e-2);
        }
    }

    #[test]
    fn oversized_segment_counts_are_clamped() {
        let g = Geometry::torus(1.0, 0.25, 100_000, 0);
        let radial = Geometry::MAX_SEGMENTS as usize;
        assert_eq!(g.vertex_count(), (radial + 1) * 4);
        assert_eq!(g.index_count(), 6 * radial * 3);
        let n = g.vertex_count() as u32;
        assert!(g.indices.iter().all(|&i| i < n));
    }

    #[test]
    fn torus_normals_are_unit() {
        let g = Geometry::torus(2.0, 0.5, 8, 8);
        for n in &g.normals {
            assert!((Vec3::from_array(*n).length() - 1.0).abs() < 1e-5);
        }
    }
}
