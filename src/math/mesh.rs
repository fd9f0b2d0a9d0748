use glam::Vec3;

use crate::math::ray::Ray;

const DEGENERATE_NORMAL: f32 = 1.0e-12;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Flat square grid on the XZ plane centered at the origin, normals up.
    /// `segments` cells per side, `(segments + 1)^2` vertices.
    pub fn grid(size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let side = segments + 1;
        let increment = size / segments as f32;
        let half = size / 2.0;

        let mut vertices = Vec::with_capacity((side * side) as usize);
        for i in 0..side {
            for j in 0..side {
                vertices.push(Vec3::new(
                    -half + i as f32 * increment,
                    0.0,
                    -half + j as f32 * increment,
                ));
            }
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for i in 0..segments {
            for j in 0..segments {
                let tl = i * side + j;
                let tr = i * side + j + 1;
                let bl = (i + 1) * side + j;
                let br = (i + 1) * side + j + 1;

                indices.extend_from_slice(&[tl, tr, bl]);
                indices.extend_from_slice(&[bl, tr, br]);
            }
        }

        let normals = vec![Vec3::Y; vertices.len()];
        Self {
            vertices,
            normals,
            indices,
        }
    }

    /// Axis-aligned cube centered at the origin with faces wound and lit from
    /// the inside, used as the sky shell.
    pub fn inward_cube(size: f32) -> Self {
        let h = size / 2.0;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut mesh = Self::default();
        for (outward, up, across) in faces {
            let base = mesh.vertices.len() as u32;
            let center = outward * h;
            for (su, sa) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)] {
                mesh.vertices.push(center + up * (su * h) + across * (sa * h));
                mesh.normals.push(-outward);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn raycast(&self, ray: &Ray) -> Option<Vec3> {
        ray.intersect_triangles(&self.vertices, &self.indices)
    }

    /// Rebuilds every vertex normal as the average of the unit face normals of
    /// the triangles that use it. Zero-area triangles contribute nothing.
    pub fn recompute_normals(&mut self) {
        let mut counts = vec![0u32; self.vertices.len()];
        self.normals.clear();
        self.normals.resize(self.vertices.len(), Vec3::ZERO);

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= self.vertices.len() || b >= self.vertices.len() || c >= self.vertices.len() {
                continue;
            }

            let edge1 = self.vertices[b] - self.vertices[a];
            let edge2 = self.vertices[c] - self.vertices[a];
            let n = edge1.cross(edge2);
            if n.length_squared() < DEGENERATE_NORMAL {
                continue;
            }
            let n = n.normalize();

            for i in [a, b, c] {
                self.normals[i] += n;
                counts[i] += 1;
            }
        }

        for (normal, count) in self.normals.iter_mut().zip(&counts) {
            if *count > 0 {
                *normal /= *count as f32;
            }
        }
    }
}
