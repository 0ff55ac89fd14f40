/// Camera - perspective viewpoint driven by the application.
///
/// The camera stores eye position, target and lens parameters and derives
/// its matrices on demand. Projection is right-handed with zero-to-one depth.
///
/// The engine does NOT store or manage cameras. They are owned and driven by
/// the caller (resize handling, input-driven orbiting).

use glam::{Mat4, Quat, Vec2, Vec3};
use super::viewpoint::Viewpoint;

/// Keeps orbiting away from the poles, where `look_at` degenerates
const MAX_ELEVATION_COS: f32 = 0.99;

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Camera at the origin looking down -Z, 45° vertical field of view
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.1,
            far: 200.0,
        }
    }

    /// Replace the lens parameters
    pub fn with_perspective(mut self, fov_y: f32, near: f32, far: f32) -> Self {
        self.fov_y = fov_y;
        self.near = near;
        self.far = far;
        self
    }

    // ===== GETTERS =====

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Aim the camera at `target`, keeping the position
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Update after the output was resized
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Rotate the eye around `center` by (yaw, pitch) radians and look at it
    ///
    /// Pitch that would carry the eye over a pole is dropped, yaw still applies.
    pub fn orbit(&mut self, angles: Vec2, center: Vec3) {
        let offset = self.position - center;
        let yaw = Quat::from_axis_angle(self.up, angles.x);

        let right = offset.cross(self.up).normalize_or_zero();
        let pitched = if right == Vec3::ZERO {
            offset
        } else {
            Quat::from_axis_angle(right, angles.y) * offset
        };

        let offset = if pitched.normalize_or_zero().dot(self.up).abs() < MAX_ELEVATION_COS {
            yaw * pitched
        } else {
            yaw * offset
        };

        self.position = center + offset;
        self.target = center;
    }
}

impl Viewpoint for Camera {
    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
