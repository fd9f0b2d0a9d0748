use glam::{Vec2, Vec3};

use crate::math::TriangleMesh;

/// Depth given to ribbon vertices while they live in screen space. wgpu clip
/// depth runs 0..1, so this sits just past the near plane.
pub const NEAR_SENTINEL: f32 = 1.0e-3;

/// Constant-width triangle strip grown from a 2D pointer path in normalized
/// device coordinates. Two vertices per accepted point.
#[derive(Clone, Debug)]
pub struct StrokeRibbon {
    path: Vec<Vec2>,
    mesh: TriangleMesh,
    width: f32,
    dirty: bool,
}

impl StrokeRibbon {
    /// One-point ribbon: two coincident vertices, no triangles yet.
    pub fn begin(point: Vec2, width: f32) -> Self {
        let vertex = point.extend(NEAR_SENTINEL);
        Self {
            path: vec![point],
            mesh: TriangleMesh {
                vertices: vec![vertex, vertex],
                normals: vec![Vec3::Z, Vec3::Z],
                indices: Vec::new(),
            },
            width,
            dirty: true,
        }
    }

    /// Appends `point` if it is farther than half the stroke width from the
    /// last accepted point. Returns whether the ribbon grew.
    pub fn extend(&mut self, point: Vec2) -> bool {
        let Some(&last) = self.path.last() else {
            return false;
        };

        let stroke = point - last;
        let half_width = self.width / 2.0;
        if stroke.length() <= half_width {
            return false;
        }

        let offset = stroke.normalize().perp() * half_width;
        let left = point - offset;
        let right = point + offset;

        let next = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(left.extend(NEAR_SENTINEL));
        self.mesh.vertices.push(right.extend(NEAR_SENTINEL));
        self.mesh.normals.extend_from_slice(&[Vec3::Z, Vec3::Z]);

        self.mesh
            .indices
            .extend_from_slice(&[next, next + 1, next - 2, next - 1, next - 2, next + 1]);

        self.path.push(point);
        self.dirty = true;
        true
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn point_count(&self) -> usize {
        self.path.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len()
    }

    #[cfg(test)]
    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut [Vec3] {
        self.dirty = true;
        &mut self.mesh.vertices
    }

    /// True once after every change, so callers re-upload only when needed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_topology(ribbon: &StrokeRibbon) {
        let n = ribbon.point_count();
        assert_eq!(ribbon.vertex_count(), 2 * n);
        assert_eq!(ribbon.triangle_count(), 2 * (n - 1));
        let vertex_count = ribbon.vertex_count() as u32;
        assert!(ribbon.mesh().indices.iter().all(|&i| i < vertex_count));
    }

    #[test]
    fn begin_is_degenerate_pair() {
        let ribbon = StrokeRibbon::begin(Vec2::new(0.25, -0.5), 0.02);
        assert_topology(&ribbon);
        assert_eq!(ribbon.mesh().vertices[0], ribbon.mesh().vertices[1]);
        assert_eq!(ribbon.mesh().vertices[0].z, NEAR_SENTINEL);
    }

    #[test]
    fn topology_holds_while_growing() {
        let mut ribbon = StrokeRibbon::begin(Vec2::ZERO, 0.02);
        for i in 1..=20 {
            let t = i as f32 * 0.05;
            assert!(ribbon.extend(Vec2::new(t, (t * 3.0).sin() * 0.2)));
            assert_topology(&ribbon);
        }
    }

    #[test]
    fn nearby_points_are_ignored() {
        let mut ribbon = StrokeRibbon::begin(Vec2::ZERO, 0.1);
        assert!(ribbon.extend(Vec2::new(0.2, 0.0)));
        let before = ribbon.vertex_count();

        for _ in 0..5 {
            assert!(!ribbon.extend(Vec2::new(0.24, 0.01)));
            assert!(!ribbon.extend(Vec2::new(0.2, 0.0)));
        }
        assert!(!ribbon.extend(Vec2::new(0.25, 0.0)));
        assert_eq!(ribbon.vertex_count(), before);
        assert_eq!(ribbon.point_count(), 2);
    }

    #[test]
    fn edge_vertices_straddle_the_point() {
        let mut ribbon = StrokeRibbon::begin(Vec2::ZERO, 0.2);
        ribbon.extend(Vec2::new(1.0, 0.0));

        let left = ribbon.mesh().vertices[2];
        let right = ribbon.mesh().vertices[3];
        assert!((left.truncate() - Vec2::new(1.0, -0.1)).length() < 1e-6);
        assert!((right.truncate() - Vec2::new(1.0, 0.1)).length() < 1e-6);
        assert_eq!(&ribbon.mesh().indices[..], &[2, 3, 0, 1, 0, 3]);
    }

    #[test]
    fn dirty_flag_tracks_growth() {
        let mut ribbon = StrokeRibbon::begin(Vec2::ZERO, 0.02);
        assert!(ribbon.take_dirty());
        assert!(!ribbon.take_dirty());
        ribbon.extend(Vec2::new(0.005, 0.0));
        assert!(!ribbon.take_dirty());
        ribbon.extend(Vec2::new(0.5, 0.0));
        assert!(ribbon.take_dirty());
    }
}
