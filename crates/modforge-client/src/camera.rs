//! Editor viewport camera and pointer rays.

use glam::{Mat4, Quat, Vec2, Vec3};

use modforge_core::math::Ray;

/// A perspective camera looking down its local -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCamera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            rotation: Quat::IDENTITY,
            fov_y_degrees: 75.0,
            near: 0.05,
            far: 4000.0,
            viewport: Vec2::new(1280.0, 720.0),
        }
    }
}

impl ViewCamera {
    /// A camera at `position` turned to face `target`, keeping +Y up.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            position,
            ..Self::default()
        };
        camera.look_at(target);
        camera
    }

    pub fn look_at(&mut self, target: Vec3) {
        let direction = (target - self.position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        self.rotation = if direction.cross(Vec3::Y).length_squared() < 1e-8 {
            // Straight up or down: no roll reference, turn directly.
            Quat::from_rotation_arc(Vec3::NEG_Z, direction)
        } else {
            let view = Mat4::look_to_rh(Vec3::ZERO, direction, Vec3::Y);
            Quat::from_mat4(&view.inverse())
        };
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.rotation * Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.viewport.x / self.viewport.y.max(1.0),
            self.near,
            self.far,
        )
    }

    /// World ray through a pointer position given in viewport pixels,
    /// origin at the top-left corner.
    pub fn ray(&self, pointer: Vec2) -> Ray {
        let size = self.viewport.max(Vec2::ONE);
        let ndc = Vec2::new(
            pointer.x / size.x * 2.0 - 1.0,
            1.0 - pointer.y / size.y * 2.0,
        );
        let inv_view_projection = (self.projection() * self.view_matrix()).inverse();
        let far = inv_view_projection.project_point3(ndc.extend(1.0));
        Ray::new(self.position, far - self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_center_ray_is_forward() {
        let camera = ViewCamera::looking_at(Vec3::new(0.0, 5.0, 5.0), Vec3::ZERO);
        let ray = camera.ray(camera.viewport / 2.0);
        assert_eq!(ray.origin, camera.position);
        assert!(close(ray.direction, Vec3::new(0.0, -1.0, -1.0).normalize()));
        assert!(close(camera.forward(), ray.direction));
    }

    #[test]
    fn test_edge_ray_follows_fov() {
        let camera = ViewCamera {
            fov_y_degrees: 90.0,
            viewport: Vec2::new(200.0, 100.0),
            ..ViewCamera::default()
        };
        let right = camera.ray(Vec2::new(200.0, 50.0));
        assert!(close(right.direction, Vec3::new(2.0, 0.0, -1.0).normalize()));

        let top = camera.ray(Vec2::new(100.0, 0.0));
        assert!(close(top.direction, Vec3::new(0.0, 1.0, -1.0).normalize()));
    }

    #[test]
    fn test_looking_straight_down() {
        let camera = ViewCamera::looking_at(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        assert!(close(camera.forward(), Vec3::NEG_Y));
        let ray = camera.ray(camera.viewport / 2.0);
        assert!(close(ray.at(10.0), Vec3::ZERO));
    }
}
