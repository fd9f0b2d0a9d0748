use glam::{Mat4, Quat, Vec2, Vec3};

use crate::math::Ray;

/// Read-only view of a camera: everything projection and picking needs,
/// nothing the renderer owns.
pub trait ViewCamera {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn projection_matrix(&self) -> Mat4;

    fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position())
    }

    fn view_matrix(&self) -> Mat4 {
        self.world_matrix().inverse()
    }

    fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the camera through a point given in normalized device
    /// coordinates.
    fn pick_ray(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection_matrix().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.position(), far - near)
    }
}

/// A transform node the scene can place in the world.
pub trait SceneNode {
    fn world_matrix(&self) -> Mat4;
    fn set_world_transform(&mut self, position: Vec3, rotation: Quat);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub struct FakeCamera {
        pub position: Vec3,
        pub rotation: Quat,
        pub projection: Mat4,
    }

    impl FakeCamera {
        pub fn looking_down_neg_z(position: Vec3) -> Self {
            Self {
                position,
                rotation: Quat::IDENTITY,
                projection: Mat4::perspective_rh(60.0_f32.to_radians(), 16.0 / 9.0, 0.1, 750.0),
            }
        }

        /// Inverse of `pick_ray` for points in front of the camera.
        pub fn project_to_ndc(&self, world: Vec3) -> Vec2 {
            self.view_projection_matrix().project_point3(world).truncate()
        }
    }

    impl ViewCamera for FakeCamera {
        fn position(&self) -> Vec3 {
            self.position
        }

        fn rotation(&self) -> Quat {
            self.rotation
        }

        fn projection_matrix(&self) -> Mat4 {
            self.projection
        }
    }
}
