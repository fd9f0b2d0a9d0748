use glam::{Mat4, Quat, Vec2, Vec3};

use crate::config::Color;
use crate::math::{Plane, Ray, TriangleMesh, look_at_rotation};
use crate::sketch::stroke::StrokeRibbon;
use crate::sketch::view::{SceneNode, ViewCamera};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BillboardMode {
    /// Vertices are normalized device coordinates drawn over the screen.
    ScreenSpace,
    /// Anchored in the world and turned towards the camera every frame.
    Tracked,
    /// Anchored in the world and never re-oriented (sky decals).
    Fixed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    pub projected: usize,
    pub missed: usize,
}

enum Target<'a> {
    Plane(Plane),
    Sky { shell: &'a TriangleMesh, offset: f32 },
}

/// A drawing surface built from one stroke. Owns its ribbon and the
/// transform that places it in the world.
#[derive(Clone, Debug)]
pub struct Billboard {
    ribbon: StrokeRibbon,
    anchor: Vec3,
    color: Color,
    position: Vec3,
    rotation: Quat,
    local_matrix: Mat4,
    mode: BillboardMode,
}

impl Billboard {
    pub fn begin(point: Vec2, anchor: Vec3, color: Color, width: f32) -> Self {
        Self {
            ribbon: StrokeRibbon::begin(point, width),
            anchor,
            color,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            local_matrix: Mat4::IDENTITY,
            mode: BillboardMode::ScreenSpace,
        }
    }

    pub fn extend(&mut self, point: Vec2) -> bool {
        if self.mode != BillboardMode::ScreenSpace {
            return false;
        }
        self.ribbon.extend(point)
    }

    /// Moves the node onto the camera and cancels the camera projection, so
    /// ribbon vertices written in device coordinates land under the pointer.
    pub fn attach_to_near_plane(&mut self, camera: &impl ViewCamera) {
        if self.mode != BillboardMode::ScreenSpace {
            return;
        }
        self.position = camera.position();
        self.rotation = camera.rotation();
        self.local_matrix = camera.projection_matrix().inverse();
    }

    /// Commits the stroke to a camera-facing plane through its own anchor.
    pub fn to_free_world_space(&mut self, camera: &impl ViewCamera) -> ProjectionReport {
        let plane = Plane::new(self.anchor, camera.forward());
        self.commit(camera, self.anchor, Target::Plane(plane), BillboardMode::Tracked)
    }

    /// Commits the stroke into the frame of an existing billboard, so both turn
    /// around the same origin.
    pub fn to_parent_billboard(
        &mut self,
        camera: &impl ViewCamera,
        parent: &Billboard,
    ) -> ProjectionReport {
        let plane = Plane::new(self.anchor, camera.forward());
        self.commit(camera, parent.position, Target::Plane(plane), BillboardMode::Tracked)
    }

    /// Commits the stroke onto the sky shell's triangles, pulled `offset`
    /// towards the camera to stay in front of the shell.
    pub fn to_sky_shell(
        &mut self,
        camera: &impl ViewCamera,
        shell: &TriangleMesh,
        offset: f32,
    ) -> ProjectionReport {
        self.commit(camera, self.anchor, Target::Sky { shell, offset }, BillboardMode::Fixed)
    }

    fn commit(
        &mut self,
        camera: &impl ViewCamera,
        position: Vec3,
        target: Target<'_>,
        mode: BillboardMode,
    ) -> ProjectionReport {
        let mut report = ProjectionReport::default();
        if self.mode != BillboardMode::ScreenSpace {
            log::warn!("billboard already committed as {:?}", self.mode);
            return report;
        }

        self.local_matrix = Mat4::IDENTITY;
        self.rotation = Quat::IDENTITY;
        self.position = position;
        if let Some(rotation) = look_at_rotation(position, ground_point(camera.position()), Vec3::Y)
        {
            self.rotation = rotation;
        }
        let inverse_rotation = self.rotation.inverse();

        for vertex in self.ribbon.vertices_mut() {
            let ray = camera.pick_ray(vertex.truncate());
            let hit = match &target {
                Target::Plane(plane) => ray.intersect_plane(plane),
                Target::Sky { shell, offset } => {
                    shell.raycast(&ray).map(|hit| hit - ray.direction * *offset)
                }
            };

            match hit {
                Some(hit) => {
                    *vertex = inverse_rotation * (hit - position);
                    report.projected += 1;
                }
                None => report.missed += 1,
            }
        }

        if report.missed > 0 {
            log::debug!(
                "{} of {} ribbon vertices missed their projection target",
                report.missed,
                report.missed + report.projected
            );
        }

        self.mode = mode;
        report
    }

    /// Turns a tracked billboard to face the camera horizontally.
    pub fn refresh_orientation(&mut self, camera_position: Vec3) {
        if self.mode != BillboardMode::Tracked {
            return;
        }
        if let Some(rotation) =
            look_at_rotation(self.position, ground_point(camera_position), Vec3::Y)
        {
            self.set_world_transform(self.position, rotation);
        }
    }

    /// Nearest world-space hit against the committed ribbon.
    pub fn raycast(&self, ray: &Ray) -> Option<Vec3> {
        if self.mode == BillboardMode::ScreenSpace {
            return None;
        }
        let world = self.world_matrix();
        let vertices: Vec<Vec3> = self
            .ribbon
            .mesh()
            .vertices
            .iter()
            .map(|v| world.transform_point3(*v))
            .collect();
        ray.intersect_triangles(&vertices, &self.ribbon.mesh().indices)
    }

    pub fn mode(&self) -> BillboardMode {
        self.mode
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    #[cfg(test)]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[cfg(test)]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[cfg(test)]
    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn ribbon(&self) -> &StrokeRibbon {
        &self.ribbon
    }

    pub fn take_dirty(&mut self) -> bool {
        self.ribbon.take_dirty()
    }
}

impl SceneNode for Billboard {
    fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position) * self.local_matrix
    }

    fn set_world_transform(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
    }
}

fn ground_point(p: Vec3) -> Vec3 {
    Vec3::new(p.x, 0.0, p.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::view::testing::FakeCamera;

    fn crayon() -> Color {
        Color::new(0.13, 0.62, 0.13)
    }

    fn sample_stroke(anchor: Vec3) -> Billboard {
        let mut billboard = Billboard::begin(Vec2::new(-0.4, -0.2), anchor, crayon(), 0.02);
        for p in [
            Vec2::new(-0.2, 0.1),
            Vec2::new(0.0, 0.3),
            Vec2::new(0.2, 0.1),
            Vec2::new(0.4, -0.2),
        ] {
            assert!(billboard.extend(p));
        }
        billboard
    }

    fn world_vertices(billboard: &Billboard) -> Vec<Vec3> {
        let world = billboard.world_matrix();
        billboard
            .ribbon()
            .mesh()
            .vertices
            .iter()
            .map(|v| world.transform_point3(*v))
            .collect()
    }

    #[test]
    fn near_plane_overlay_is_pixel_aligned() {
        let mut camera = FakeCamera::looking_down_neg_z(Vec3::new(3.0, 2.0, 4.0));
        camera.rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.2);

        let mut billboard = sample_stroke(Vec3::ZERO);
        billboard.attach_to_near_plane(&camera);

        let clip_from_local = camera.view_projection_matrix() * billboard.world_matrix();
        for v in &billboard.ribbon().mesh().vertices {
            let clip = clip_from_local * v.extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!((ndc.truncate() - v.truncate()).length() < 1e-4);
            assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn free_world_projection_round_trips() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 0.0, 5.0));
        let mut billboard = sample_stroke(Vec3::ZERO);
        let screen: Vec<Vec2> = billboard
            .ribbon()
            .mesh()
            .vertices
            .iter()
            .map(|v| v.truncate())
            .collect();

        let report = billboard.to_free_world_space(&camera);
        assert_eq!(report.missed, 0);
        assert_eq!(report.projected, screen.len());
        assert_eq!(billboard.mode(), BillboardMode::Tracked);
        assert_eq!(billboard.local_matrix(), Mat4::IDENTITY);

        for (world, original) in world_vertices(&billboard).iter().zip(&screen) {
            assert!((camera.project_to_ndc(*world) - *original).length() < 1e-4);
        }

        let scale_x = 5.0 * (30.0_f32.to_radians()).tan() * 16.0 / 9.0;
        let scale_y = 5.0 * (30.0_f32.to_radians()).tan();
        for (local, original) in billboard.ribbon().mesh().vertices.iter().zip(&screen) {
            assert!(local.z.abs() < 1e-4);
            assert!((local.x - original.x * scale_x).abs() < 1e-3);
            assert!((local.y - original.y * scale_y).abs() < 1e-3);
        }
    }

    #[test]
    fn parent_projection_shares_parent_origin() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 1.0, 6.0));
        let mut parent = sample_stroke(Vec3::new(0.0, 0.0, -1.0));
        parent.to_free_world_space(&camera);

        let anchor = Vec3::new(0.3, 1.2, -1.0);
        let mut child = Billboard::begin(Vec2::new(0.05, 0.05), anchor, crayon(), 0.02);
        child.extend(Vec2::new(0.15, 0.1));
        child.to_parent_billboard(&camera, &parent);

        assert_eq!(child.position(), parent.position());
        let plane = Plane::new(anchor, camera.forward());
        for world in world_vertices(&child) {
            assert!(plane.signed_distance(world).abs() < 1e-3);
        }
    }

    #[test]
    fn sky_projection_sits_just_inside_shell() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let sky = TriangleMesh::inward_cube(500.0);
        let mut billboard = sample_stroke(Vec3::new(0.0, 2.0, -250.0));

        let report = billboard.to_sky_shell(&camera, &sky, 0.5);
        assert_eq!(report.missed, 0);
        assert_eq!(billboard.mode(), BillboardMode::Fixed);

        for world in world_vertices(&billboard) {
            let depth = -world.z;
            assert!(depth < 250.0 && depth > 249.0, "depth {depth}");
        }

        let before = billboard.rotation();
        billboard.refresh_orientation(Vec3::new(40.0, 2.0, 10.0));
        assert_eq!(billboard.rotation(), before);
    }

    #[test]
    fn same_stroke_different_anchor_differs_in_position_only() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let sky = TriangleMesh::inward_cube(500.0);

        let mut free = sample_stroke(Vec3::new(0.0, 0.0, -4.0));
        let mut fixed = sample_stroke(Vec3::new(0.0, 2.0, -250.0));
        free.to_free_world_space(&camera);
        fixed.to_sky_shell(&camera, &sky, 0.5);

        assert_eq!(free.ribbon().mesh().indices, fixed.ribbon().mesh().indices);
        let moved = world_vertices(&free)
            .iter()
            .zip(world_vertices(&fixed))
            .all(|(a, b)| a.distance(b) > 1.0);
        assert!(moved);
    }

    #[test]
    fn unreachable_plane_leaves_vertices_alone() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 0.0, 5.0));
        let mut billboard = sample_stroke(Vec3::new(0.0, 0.0, 20.0));
        let before = billboard.ribbon().mesh().vertices.clone();

        let report = billboard.to_free_world_space(&camera);
        assert_eq!(report.projected, 0);
        assert_eq!(report.missed, before.len());
        assert_eq!(billboard.ribbon().mesh().vertices, before);
    }

    #[test]
    fn commit_happens_once() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 0.0, 5.0));
        let mut billboard = sample_stroke(Vec3::ZERO);
        billboard.to_free_world_space(&camera);
        let committed = billboard.ribbon().mesh().vertices.clone();

        let sky = TriangleMesh::inward_cube(500.0);
        assert_eq!(billboard.to_sky_shell(&camera, &sky, 0.5), ProjectionReport::default());
        assert!(!billboard.extend(Vec2::new(0.9, 0.9)));
        assert_eq!(billboard.ribbon().mesh().vertices, committed);
        assert_eq!(billboard.mode(), BillboardMode::Tracked);
    }

    #[test]
    fn tracked_billboard_turns_towards_camera() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 5.0));
        let mut billboard = sample_stroke(Vec3::ZERO);
        billboard.to_free_world_space(&camera);

        let eye = Vec3::new(5.0, 2.0, 0.0);
        billboard.refresh_orientation(eye);
        let facing = billboard.rotation() * Vec3::Z;
        assert!(facing.distance(Vec3::X) < 1e-5);
    }

    #[test]
    fn committed_billboard_can_be_picked() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 0.0, 5.0));
        let mut billboard = sample_stroke(Vec3::ZERO);
        assert!(billboard.raycast(&camera.pick_ray(Vec2::new(0.0, 0.3))).is_none());

        billboard.to_free_world_space(&camera);
        let hit = billboard.raycast(&camera.pick_ray(Vec2::new(-0.1, 0.2)));
        assert!(hit.is_some_and(|h| h.z.abs() < 1e-3));
        assert!(billboard.raycast(&camera.pick_ray(Vec2::new(0.0, -0.6))).is_none());
    }
}
