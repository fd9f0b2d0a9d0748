use glam::{Mat3, Quat, Vec3};

const PARALLEL_EPSILON: f32 = 1.0e-6;
const HIT_EPSILON: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Infinite plane through `point` with unit `normal`. Built fresh for every
/// projection and never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.point).dot(self.normal)
    }

    /// Perpendicular projection of `p` onto the plane.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p - self.normal * self.signed_distance(p)
    }
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn intersect_plane(&self, plane: &Plane) -> Option<Vec3> {
        let denom = self.direction.dot(plane.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (plane.point - self.origin).dot(plane.normal) / denom;
        if t < 0.0 {
            return None;
        }

        Some(self.at(t))
    }

    /// Moller-Trumbore against a single triangle, both faces. Returns the ray
    /// parameter of the hit.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > HIT_EPSILON).then_some(t)
    }

    /// Nearest hit against an indexed triangle list. Triangles referencing
    /// missing vertices are ignored.
    pub fn intersect_triangles(&self, vertices: &[Vec3], indices: &[u32]) -> Option<Vec3> {
        let mut nearest: Option<f32> = None;

        for tri in indices.chunks_exact(3) {
            let (Some(&a), Some(&b), Some(&c)) = (
                vertices.get(tri[0] as usize),
                vertices.get(tri[1] as usize),
                vertices.get(tri[2] as usize),
            ) else {
                continue;
            };

            if let Some(t) = self.intersect_triangle(a, b, c) {
                if nearest.is_none_or(|best| t < best) {
                    nearest = Some(t);
                }
            }
        }

        nearest.map(|t| self.at(t))
    }
}

/// Rotation whose local +Z axis points from `from` towards `to`, keeping
/// local +Y as close to `up` as possible. `None` when the direction is
/// degenerate or parallel to `up`.
pub fn look_at_rotation(from: Vec3, to: Vec3, up: Vec3) -> Option<Quat> {
    let forward = (to - from).try_normalize()?;
    let right = up.cross(forward).try_normalize()?;
    let true_up = forward.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, true_up, forward)).normalize())
}
