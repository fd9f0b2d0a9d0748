use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::math::{Plane, Ray, TriangleMesh};
use crate::sketch::view::ViewCamera;

const MIN_PLANE_SPAN: f32 = 1.0e-4;
const MIN_SEGMENT_WIDTH: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FalloffShape {
    Linear,
    #[default]
    Quadratic,
    Cosine,
    Smooth,
}

impl FalloffShape {
    pub const ALL: [FalloffShape; 4] = [
        FalloffShape::Linear,
        FalloffShape::Quadratic,
        FalloffShape::Cosine,
        FalloffShape::Smooth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FalloffShape::Linear => "Linear",
            FalloffShape::Quadratic => "Quadratic",
            FalloffShape::Cosine => "Cosine",
            FalloffShape::Smooth => "Smooth",
        }
    }
}

/// Lateral attenuation of a terrain edit: 1 on the stroke plane, 0 at
/// `radius` and beyond.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FalloffKernel {
    pub shape: FalloffShape,
    pub radius: f32,
}

impl Default for FalloffKernel {
    fn default() -> Self {
        Self::new(FalloffShape::Quadratic, 5.0)
    }
}

impl FalloffKernel {
    pub fn new(shape: FalloffShape, radius: f32) -> Self {
        Self { shape, radius }
    }

    pub fn weight(&self, distance: f32) -> f32 {
        if self.radius <= 0.0 {
            return if distance == 0.0 { 1.0 } else { 0.0 };
        }
        let t = distance.abs() / self.radius;
        if t >= 1.0 {
            return 0.0;
        }

        match self.shape {
            FalloffShape::Linear => 1.0 - t,
            FalloffShape::Quadratic => 1.0 - t * t,
            FalloffShape::Cosine => 0.5 * (1.0 + (PI * t).cos()),
            FalloffShape::Smooth => (1.0 - t * t) * (1.0 - t * t),
        }
    }
}

/// The editable ground grid. Topology is fixed at construction; positions and
/// normals change only through [`TerrainDeformer`].
#[derive(Clone, Debug)]
pub struct Ground {
    mesh: TriangleMesh,
    dirty: bool,
}

impl Ground {
    pub fn new(size: f32, segments: u32) -> Self {
        Self {
            mesh: TriangleMesh::grid(size, segments),
            dirty: true,
        }
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    #[cfg(test)]
    pub fn vertices(&self) -> &[Vec3] {
        &self.mesh.vertices
    }

    #[cfg(test)]
    pub fn normals(&self) -> &[Vec3] {
        &self.mesh.normals
    }

    pub fn raycast(&self, ray: &Ray) -> Option<Vec3> {
        self.mesh.raycast(ray)
    }

    /// Ground height straight below (or above) `x, z`, found with a vertical
    /// ray from above the highest vertex.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let top = self
            .mesh
            .vertices
            .iter()
            .map(|v| v.y)
            .fold(f32::NEG_INFINITY, f32::max);
        if !top.is_finite() {
            return None;
        }
        let ray = Ray::new(Vec3::new(x, top + 1.0, z), Vec3::NEG_Y);
        self.raycast(&ray).map(|hit| hit.y)
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("stroke too short to reshape ground ({points} points, need {min})")]
    TooFewPoints { points: usize, min: usize },

    #[error("stroke starts and ends at the same spot, cannot build a profile plane")]
    DegeneratePlane,

    #[error("only {0} stroke points reached the profile plane")]
    SilhouetteTooShort(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeformOutcome {
    Applied { vertices_moved: usize, max_offset: f32 },
    Skipped(SkipReason),
}

/// Turns a ground-to-ground stroke into a ridge or valley: the stroke is
/// flattened onto an upright plane through its endpoints, and every ground
/// vertex is raised or lowered towards that silhouette, fading with distance
/// from the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainDeformer {
    pub min_points: usize,
    pub falloff: FalloffKernel,
}

impl Default for TerrainDeformer {
    fn default() -> Self {
        Self {
            min_points: 6,
            falloff: FalloffKernel::default(),
        }
    }
}

impl TerrainDeformer {
    pub fn new(min_points: usize, falloff: FalloffKernel) -> Self {
        Self {
            min_points,
            falloff,
        }
    }

    pub fn reshape(
        &self,
        ground: &mut Ground,
        path: &[Vec2],
        ground_start: Vec3,
        ground_end: Vec3,
        camera: &impl ViewCamera,
    ) -> DeformOutcome {
        if path.len() < self.min_points {
            return DeformOutcome::Skipped(SkipReason::TooFewPoints {
                points: path.len(),
                min: self.min_points,
            });
        }

        let Some(plane) = profile_plane(ground_start, ground_end) else {
            return DeformOutcome::Skipped(SkipReason::DegeneratePlane);
        };

        let curve = silhouette_curve(path, &plane, camera);
        if curve.len() < 2 {
            return DeformOutcome::Skipped(SkipReason::SilhouetteTooShort(curve.len()));
        }
        if curve.len() < path.len() {
            log::debug!(
                "{} stroke points missed the profile plane",
                path.len() - curve.len()
            );
        }

        let (vertices_moved, max_offset) = self.apply_heights(ground, &curve, &plane);
        ground.mesh.recompute_normals();
        ground.dirty = true;

        DeformOutcome::Applied {
            vertices_moved,
            max_offset,
        }
    }

    /// Raises every vertex by the silhouette offset above its projection on the
    /// plane, weighted by the falloff of its distance to the plane.
    pub fn apply_heights(&self, ground: &mut Ground, curve: &[Vec3], plane: &Plane) -> (usize, f32) {
        let mut moved = 0;
        let mut max_offset = 0.0_f32;

        for vertex in &mut ground.mesh.vertices {
            let weight = self.falloff.weight(plane.signed_distance(*vertex));
            if weight <= 0.0 {
                continue;
            }

            let h = profile_offset(plane.closest_point(*vertex), curve, plane);
            if h == 0.0 {
                continue;
            }

            let offset = weight * h;
            vertex.y += offset;
            moved += 1;
            if offset.abs() > max_offset.abs() {
                max_offset = offset;
            }
        }

        (moved, max_offset)
    }
}

/// Upright plane containing both ground points, its normal horizontal and
/// perpendicular to the line between them.
pub fn profile_plane(ground_start: Vec3, ground_end: Vec3) -> Option<Plane> {
    let span = ground_end - ground_start;
    let horizontal = Vec3::new(span.x, 0.0, span.z);
    if horizontal.length() < MIN_PLANE_SPAN {
        return None;
    }
    let normal = Vec3::Y.cross(horizontal).normalize();
    Some(Plane::new(ground_start, normal))
}

/// The stroke re-cast onto `plane`, in drawing order. Samples whose pick ray
/// misses the plane are dropped.
pub fn silhouette_curve(path: &[Vec2], plane: &Plane, camera: &impl ViewCamera) -> Vec<Vec3> {
    path.iter()
        .filter_map(|p| camera.pick_ray(*p).intersect_plane(plane))
        .collect()
}

/// Height of the silhouette above `closest` (a point on `plane`), measured at
/// the same horizontal position along the plane. Zero when the point is not
/// under the curve.
pub fn profile_offset(closest: Vec3, curve: &[Vec3], plane: &Plane) -> f32 {
    let Some(&origin) = curve.first() else {
        return 0.0;
    };
    let plane_x = Vec3::Y.cross(plane.normal).normalize();
    let along = |p: Vec3| (p - origin).dot(plane_x);

    let target = along(closest);
    for pair in curve.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (xa, xb) = (along(a), along(b));
        let (lo, hi, y_lo, y_hi) = if xa <= xb {
            (xa, xb, a.y, b.y)
        } else {
            (xb, xa, b.y, a.y)
        };

        if lo <= target && target <= hi {
            let width = hi - lo;
            let alpha = if width < MIN_SEGMENT_WIDTH {
                0.0
            } else {
                (target - lo) / width
            };
            let y_curve = y_lo + alpha * (y_hi - y_lo);
            return y_curve - closest.y;
        }
    }

    0.0
}
