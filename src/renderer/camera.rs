use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::sketch::ViewCamera;

/// First-person walker: yaw/pitch look, horizontal movement, height set from
/// the ground under it.
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub speed_step: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 3.5),
            yaw: -FRAC_PI_2,
            pitch: 0.0,

            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 750.0,

            move_speed: 5.0,
            mouse_sensitivity: 0.002,
            speed_step: 0.5,
        }
    }
}

impl Camera {
    pub fn standing_at(x: f32, eye_height: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, eye_height, z),
            ..Self::default()
        }
    }

    /// Walks in the ground plane; looking up or down does not change speed.
    /// Returns whether the camera moved.
    pub fn process_keyboard(&mut self, forward: f32, right: f32, dt: f32) -> bool {
        if forward == 0.0 && right == 0.0 {
            return false;
        }

        let speed = self.move_speed * dt;
        let heading = Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin());
        let side = heading.cross(Vec3::Y);

        self.position += heading * forward * speed;
        self.position += side * right * speed;
        true
    }

    pub fn process_mouse_movement(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }

        self.yaw += delta.x * self.mouse_sensitivity;
        self.pitch -= delta.y * self.mouse_sensitivity;

        let max_pitch = 89.0_f32.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);
        true
    }

    pub fn process_scroll(&mut self, delta: f32) {
        self.move_speed = (self.move_speed + delta * self.speed_step).clamp(0.5, 50.0);
    }

    pub fn set_eye_height(&mut self, y: f32) {
        self.position.y = y;
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }

    /// Normalized device coordinates of a window position in physical pixels.
    pub fn cursor_to_ndc(cursor: Vec2, width: f32, height: f32) -> Vec2 {
        Vec2::new(
            2.0 * cursor.x / width.max(1.0) - 1.0,
            1.0 - 2.0 * cursor.y / height.max(1.0),
        )
    }
}

impl ViewCamera for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        Quat::from_rotation_y(-(self.yaw + FRAC_PI_2)) * Quat::from_rotation_x(self.pitch)
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _padding: 0.0,
        }
    }
}
