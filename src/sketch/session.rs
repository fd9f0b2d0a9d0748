use glam::{Vec2, Vec3};

use crate::config::{Color, STROKE_WIDTH_RANGE, SketchConfig};
use crate::math::TriangleMesh;
use crate::sketch::billboard::{Billboard, BillboardMode, ProjectionReport};
use crate::sketch::terrain::{DeformOutcome, FalloffKernel, Ground, TerrainDeformer};
use crate::sketch::view::ViewCamera;

/// What the pointer landed on when the current stroke began.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    Ground,
    Sky,
    Billboard(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum StrokeOutcome {
    NoStroke,
    Placed {
        index: usize,
        report: ProjectionReport,
    },
    Terrain(DeformOutcome),
}

#[derive(Debug)]
struct ActiveStroke {
    billboard: Billboard,
    state: DrawState,
}

/// Owns the scene geometry and routes pointer strokes to the right
/// projection: onto an existing billboard, the sky, free space, or the ground.
#[derive(Debug)]
pub struct Sketcher {
    config: SketchConfig,
    deformer: TerrainDeformer,
    ground: Ground,
    sky: TriangleMesh,
    billboards: Vec<Billboard>,
    active: Option<ActiveStroke>,
    last_diagnostic: Option<String>,
}

impl Sketcher {
    pub fn new(config: SketchConfig) -> Self {
        Self {
            deformer: TerrainDeformer::new(config.min_terrain_points, config.falloff),
            ground: Ground::new(config.ground_size, config.ground_segments),
            sky: TriangleMesh::inward_cube(config.sky_size),
            billboards: Vec::new(),
            active: None,
            last_diagnostic: None,
            config,
        }
    }

    /// Starts a stroke under `ndc`. Tracked billboards are tested first, then
    /// the ground, then the sky; the hit becomes the stroke's anchor. Sky
    /// decals are never parents, a stroke over one starts on the sky.
    pub fn begin_stroke(&mut self, ndc: Vec2, camera: &impl ViewCamera) -> DrawState {
        if let Some(active) = &self.active {
            return active.state;
        }

        let ray = camera.pick_ray(ndc);
        let on_billboard = self
            .billboards
            .iter()
            .enumerate()
            .filter(|(_, b)| b.mode() == BillboardMode::Tracked)
            .filter_map(|(i, b)| b.raycast(&ray).map(|hit| (i, hit)))
            .min_by(|(_, a), (_, b)| {
                a.distance_squared(ray.origin)
                    .total_cmp(&b.distance_squared(ray.origin))
            });

        let (state, anchor) = if let Some((index, hit)) = on_billboard {
            (DrawState::Billboard(index), hit)
        } else if let Some(hit) = self.ground.raycast(&ray) {
            (DrawState::Ground, hit)
        } else if let Some(hit) = self.sky.raycast(&ray) {
            (DrawState::Sky, hit)
        } else {
            log::debug!("stroke start at {ndc} hit nothing");
            return DrawState::Idle;
        };

        let mut billboard = Billboard::begin(
            ndc,
            anchor,
            self.config.crayon_color,
            self.config.stroke_width,
        );
        billboard.attach_to_near_plane(camera);
        log::debug!("stroke started on {state:?} at {anchor}");

        self.active = Some(ActiveStroke { billboard, state });
        state
    }

    pub fn extend_stroke(&mut self, ndc: Vec2, camera: &impl ViewCamera) -> bool {
        let Some(active) = &mut self.active else {
            return false;
        };
        let grew = active.billboard.extend(ndc);
        active.billboard.attach_to_near_plane(camera);
        grew
    }

    /// Commits the stroke according to where it started. The release point
    /// `ndc` is not added to the path; it only decides whether a ground
    /// stroke also ended on the ground.
    pub fn end_stroke(&mut self, ndc: Vec2, camera: &impl ViewCamera) -> StrokeOutcome {
        match self.state() {
            DrawState::Idle => StrokeOutcome::NoStroke,
            DrawState::Billboard(parent) => self.commit_to_parent(parent, camera),
            DrawState::Sky => self.commit_to_sky(camera),
            DrawState::Ground => match self.ground.raycast(&camera.pick_ray(ndc)) {
                Some(ground_end) => self.commit_as_terrain_edit(ground_end, camera),
                None => self.commit_to_world(camera),
            },
        }
    }

    /// Drops the stroke in progress without touching the scene.
    pub fn cancel_stroke(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn commit_to_world(&mut self, camera: &impl ViewCamera) -> StrokeOutcome {
        let Some(ActiveStroke { mut billboard, .. }) = self.active.take() else {
            return StrokeOutcome::NoStroke;
        };
        let report = billboard.to_free_world_space(camera);
        self.place(billboard, report)
    }

    /// Commits into the frame of billboard `parent`, or into free space if
    /// there is no such billboard.
    pub fn commit_to_parent(&mut self, parent: usize, camera: &impl ViewCamera) -> StrokeOutcome {
        let Some(ActiveStroke { mut billboard, .. }) = self.active.take() else {
            return StrokeOutcome::NoStroke;
        };
        let report = match self.billboards.get(parent) {
            Some(parent) => billboard.to_parent_billboard(camera, parent),
            None => {
                log::warn!("parent billboard {parent} is gone, placing stroke in free space");
                billboard.to_free_world_space(camera)
            }
        };
        self.place(billboard, report)
    }

    pub fn commit_to_sky(&mut self, camera: &impl ViewCamera) -> StrokeOutcome {
        let Some(ActiveStroke { mut billboard, .. }) = self.active.take() else {
            return StrokeOutcome::NoStroke;
        };
        let report = billboard.to_sky_shell(camera, &self.sky, self.config.sky_offset);
        self.place(billboard, report)
    }

    /// Reshapes the ground along the stroke, which must have started on the
    /// ground. The ribbon is discarded either way.
    pub fn commit_as_terrain_edit(
        &mut self,
        ground_end: Vec3,
        camera: &impl ViewCamera,
    ) -> StrokeOutcome {
        let Some(ActiveStroke { billboard, .. }) = self.active.take() else {
            return StrokeOutcome::NoStroke;
        };

        let outcome = self.deformer.reshape(
            &mut self.ground,
            billboard.ribbon().path(),
            billboard.anchor(),
            ground_end,
            camera,
        );

        match &outcome {
            DeformOutcome::Applied {
                vertices_moved,
                max_offset,
            } => {
                log::info!("reshaped ground: {vertices_moved} vertices, peak offset {max_offset:.2}");
                self.last_diagnostic = None;
            }
            DeformOutcome::Skipped(reason) => {
                log::warn!("ground left unchanged: {reason}");
                self.last_diagnostic = Some(reason.to_string());
            }
        }

        StrokeOutcome::Terrain(outcome)
    }

    fn place(&mut self, billboard: Billboard, report: ProjectionReport) -> StrokeOutcome {
        log::info!(
            "committed {:?} billboard with {} vertices",
            billboard.mode(),
            billboard.ribbon().vertex_count()
        );
        self.last_diagnostic = (report.missed > 0).then(|| {
            format!(
                "{} of {} vertices missed their target",
                report.missed,
                report.missed + report.projected
            )
        });

        self.billboards.push(billboard);
        StrokeOutcome::Placed {
            index: self.billboards.len() - 1,
            report,
        }
    }

    /// Turns tracked billboards towards the camera. Call after the camera
    /// moves.
    pub fn refresh_orientation(&mut self, camera_position: Vec3) {
        for billboard in &mut self.billboards {
            billboard.refresh_orientation(camera_position);
        }
    }

    /// Eye height for a camera standing at `x, z`, if it is over the ground.
    pub fn walk_height(&self, x: f32, z: f32) -> Option<f32> {
        self.ground
            .height_at(x, z)
            .map(|h| h + self.config.camera_height)
    }

    pub fn state(&self) -> DrawState {
        self.active.as_ref().map_or(DrawState::Idle, |a| a.state)
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_stroke(&self) -> Option<&Billboard> {
        self.active.as_ref().map(|a| &a.billboard)
    }

    pub fn active_stroke_mut(&mut self) -> Option<&mut Billboard> {
        self.active.as_mut().map(|a| &mut a.billboard)
    }

    pub fn billboards(&self) -> &[Billboard] {
        &self.billboards
    }

    pub fn billboards_mut(&mut self) -> &mut [Billboard] {
        &mut self.billboards
    }

    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    pub fn ground_mut(&mut self) -> &mut Ground {
        &mut self.ground
    }

    pub fn sky(&self) -> &TriangleMesh {
        &self.sky
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn last_diagnostic(&self) -> Option<&str> {
        self.last_diagnostic.as_deref()
    }

    pub fn set_crayon_color(&mut self, color: Color) {
        self.config.crayon_color = color;
    }

    pub fn set_sky_color(&mut self, color: Color) {
        self.config.sky_color = color;
    }

    pub fn set_ground_color(&mut self, color: Color) {
        self.config.ground_color = color;
    }

    /// Applies to the next stroke; clamped to the supported range.
    pub fn set_stroke_width(&mut self, width: f32) {
        self.config.stroke_width = width.clamp(*STROKE_WIDTH_RANGE.start(), *STROKE_WIDTH_RANGE.end());
    }

    pub fn set_falloff(&mut self, falloff: FalloffKernel) {
        self.config.falloff = falloff;
        self.deformer.falloff = falloff;
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::sketch::terrain::SkipReason;
    use crate::sketch::view::SceneNode;
    use crate::sketch::view::testing::FakeCamera;

    fn small_world() -> Sketcher {
        Sketcher::new(SketchConfig {
            ground_size: 20.0,
            ground_segments: 40,
            ..SketchConfig::default()
        })
    }

    fn vertex_height(sketcher: &Sketcher, x: f32, z: f32) -> f32 {
        sketcher
            .ground()
            .vertices()
            .iter()
            .find(|v| (v.x - x).abs() < 1e-3 && (v.z - z).abs() < 1e-3)
            .map(|v| v.y)
            .unwrap()
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

    fn draw(sketcher: &mut Sketcher, camera: &FakeCamera, ndc: &[Vec2]) -> StrokeOutcome {
        let (first, rest) = ndc.split_first().unwrap();
        sketcher.begin_stroke(*first, camera);
        for p in rest {
            sketcher.extend_stroke(*p, camera);
        }
        sketcher.end_stroke(*ndc.last().unwrap(), camera)
    }

    fn hill_path(camera: &FakeCamera) -> Vec<Vec2> {
        [
            Vec3::new(-3.0, 0.0, 0.0),
            Vec3::new(-1.5, 1.5, 0.0),
            Vec3::new(-0.5, 2.0, 0.0),
            Vec3::new(0.5, 2.0, 0.0),
            Vec3::new(1.5, 1.5, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]
        .iter()
        .map(|p| camera.project_to_ndc(*p))
        .collect()
    }

    #[test]
    fn ground_stroke_raises_a_hill() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 10.0));
        let mut sketcher = small_world();
        let path = hill_path(&camera);

        assert_eq!(sketcher.begin_stroke(path[0], &camera), DrawState::Ground);
        for p in &path[1..] {
            assert!(sketcher.extend_stroke(*p, &camera));
        }
        let outcome = sketcher.end_stroke(path[5], &camera);

        assert!(matches!(outcome, StrokeOutcome::Terrain(DeformOutcome::Applied { .. })));
        assert!(sketcher.billboards().is_empty());
        assert!(!sketcher.is_drawing());
        assert!(vertex_height(&sketcher, 0.0, 0.0) > 1.9);
        assert_eq!(vertex_height(&sketcher, 0.0, 6.0), 0.0);
        assert_eq!(vertex_height(&sketcher, 0.0, -6.0), 0.0);
        assert!(sketcher.walk_height(0.0, 0.0).is_some_and(|h| h > 3.9));
    }

    #[test]
    fn short_ground_stroke_is_rejected() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 10.0));
        let mut sketcher = small_world();
        let before = sketcher.ground().mesh().clone();
        let path: Vec<Vec2> = [
            Vec3::new(-3.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]
        .iter()
        .map(|p| camera.project_to_ndc(*p))
        .collect();

        let outcome = draw(&mut sketcher, &camera, &path);
        assert_eq!(
            outcome,
            StrokeOutcome::Terrain(DeformOutcome::Skipped(SkipReason::TooFewPoints {
                points: 3,
                min: 6
            }))
        );
        assert_eq!(sketcher.ground().mesh(), &before);
        assert!(sketcher.billboards().is_empty());
        assert!(sketcher.last_diagnostic().is_some());
    }

    #[test]
    fn release_point_is_not_part_of_the_stroke() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 10.0));
        let mut sketcher = small_world();
        let before = sketcher.ground().mesh().clone();
        let path = hill_path(&camera);

        sketcher.begin_stroke(path[0], &camera);
        for p in &path[1..5] {
            sketcher.extend_stroke(*p, &camera);
        }
        let outcome = sketcher.end_stroke(path[5], &camera);

        assert_eq!(
            outcome,
            StrokeOutcome::Terrain(DeformOutcome::Skipped(SkipReason::TooFewPoints {
                points: 5,
                min: 6
            }))
        );
        assert_eq!(sketcher.ground().mesh(), &before);
    }

    #[test]
    fn same_stroke_lands_in_world_or_sky() {
        let path = [
            Vec2::new(-0.4, -0.2),
            Vec2::new(-0.2, 0.0),
            Vec2::new(0.0, 0.1),
            Vec2::new(0.2, 0.2),
            Vec2::new(0.4, 0.3),
        ];

        let level = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let mut on_ground = Sketcher::new(SketchConfig::default());
        let outcome = draw(&mut on_ground, &level, &path);
        assert!(matches!(outcome, StrokeOutcome::Placed { index: 0, .. }));

        let mut looking_up = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        looking_up.rotation = Quat::from_rotation_x(0.8);
        let mut in_sky = Sketcher::new(SketchConfig::default());
        draw(&mut in_sky, &looking_up, &path);

        let free = &on_ground.billboards()[0];
        let fixed = &in_sky.billboards()[0];
        assert_eq!(free.mode(), BillboardMode::Tracked);
        assert_eq!(fixed.mode(), BillboardMode::Fixed);
        assert_eq!(free.ribbon().mesh().indices, fixed.ribbon().mesh().indices);

        let apart = world_vertices(free)
            .iter()
            .zip(world_vertices(fixed))
            .all(|(a, b)| a.distance(b) > 1.0);
        assert!(apart);
    }

    #[test]
    fn stroke_on_billboard_attaches_to_it() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let mut sketcher = Sketcher::new(SketchConfig::default());
        draw(
            &mut sketcher,
            &camera,
            &[
                Vec2::new(-0.3, -0.3),
                Vec2::new(-0.1, -0.1),
                Vec2::new(0.1, 0.1),
                Vec2::new(0.3, 0.3),
            ],
        );
        assert_eq!(sketcher.billboards().len(), 1);

        let on_parent = Vec2::new(-0.05, -0.05);
        assert_eq!(sketcher.begin_stroke(on_parent, &camera), DrawState::Billboard(0));
        sketcher.extend_stroke(Vec2::new(0.05, 0.2), &camera);
        sketcher.extend_stroke(Vec2::new(0.1, 0.3), &camera);
        let outcome = sketcher.end_stroke(Vec2::new(0.1, 0.3), &camera);

        assert!(matches!(outcome, StrokeOutcome::Placed { index: 1, .. }));
        let [parent, child] = sketcher.billboards() else {
            panic!("expected two billboards");
        };
        assert_eq!(child.position(), parent.position());
        assert_eq!(child.mode(), BillboardMode::Tracked);
    }

    #[test]
    fn stroke_over_sky_decal_stays_on_the_sky() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let mut sketcher = Sketcher::new(SketchConfig::default());
        let decal = [
            Vec2::new(-0.3, 0.5),
            Vec2::new(-0.1, 0.5),
            Vec2::new(0.1, 0.5),
            Vec2::new(0.3, 0.5),
        ];
        draw(&mut sketcher, &camera, &decal);
        assert_eq!(sketcher.billboards()[0].mode(), BillboardMode::Fixed);
        assert!(
            sketcher.billboards()[0]
                .raycast(&camera.pick_ray(Vec2::new(0.05, 0.5)))
                .is_some()
        );

        let over_decal = [Vec2::new(0.05, 0.5), Vec2::new(0.05, 0.6), Vec2::new(0.15, 0.7)];
        assert_eq!(sketcher.begin_stroke(over_decal[0], &camera), DrawState::Sky);
        for p in &over_decal[1..] {
            sketcher.extend_stroke(*p, &camera);
        }
        let outcome = sketcher.end_stroke(over_decal[2], &camera);
        assert!(matches!(outcome, StrokeOutcome::Placed { index: 1, .. }));

        let rotations: Vec<Quat> = sketcher.billboards().iter().map(|b| b.rotation()).collect();
        sketcher.refresh_orientation(Vec3::new(40.0, 2.0, 10.0));
        for (billboard, before) in sketcher.billboards().iter().zip(rotations) {
            assert_eq!(billboard.mode(), BillboardMode::Fixed);
            assert_eq!(billboard.rotation(), before);
        }
    }

    #[test]
    fn cancel_discards_the_stroke() {
        let camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let mut sketcher = Sketcher::new(SketchConfig::default());
        assert_eq!(sketcher.begin_stroke(Vec2::new(0.0, 0.5), &camera), DrawState::Sky);
        sketcher.extend_stroke(Vec2::new(0.2, 0.5), &camera);

        assert!(sketcher.cancel_stroke());
        assert_eq!(sketcher.state(), DrawState::Idle);
        assert_eq!(sketcher.end_stroke(Vec2::ZERO, &camera), StrokeOutcome::NoStroke);
        assert!(sketcher.billboards().is_empty());
        assert!(!sketcher.cancel_stroke());
    }

    #[test]
    fn active_stroke_follows_the_camera() {
        let mut camera = FakeCamera::looking_down_neg_z(Vec3::new(0.0, 2.0, 3.5));
        let mut sketcher = Sketcher::new(SketchConfig::default());
        sketcher.begin_stroke(Vec2::new(0.0, 0.5), &camera);

        camera.position = Vec3::new(1.0, 2.0, 0.0);
        sketcher.extend_stroke(Vec2::new(0.3, 0.5), &camera);
        let active = sketcher.active_stroke().unwrap();
        assert_eq!(active.position(), camera.position);
        assert_eq!(active.mode(), BillboardMode::ScreenSpace);
    }

    #[test]
    fn walking_tracks_flat_ground() {
        let sketcher = small_world();
        let h = sketcher.walk_height(1.0, -2.0).unwrap();
        assert!((h - 2.0).abs() < 1e-5);
        assert!(sketcher.walk_height(30.0, 0.0).is_none());
    }

    #[test]
    fn stroke_width_is_clamped() {
        let mut sketcher = small_world();
        sketcher.set_stroke_width(1.0);
        assert_eq!(sketcher.config().stroke_width, *STROKE_WIDTH_RANGE.end());
        sketcher.set_stroke_width(0.0);
        assert_eq!(sketcher.config().stroke_width, *STROKE_WIDTH_RANGE.start());
    }
}
