/// Spot light - the viewpoint the shadow map is rendered from.
///
/// Uses a square perspective frustum (the shadow map is square) with the
/// cone angle as field of view.

use glam::{Mat4, Vec3};
use super::viewpoint::Viewpoint;

#[derive(Debug, Clone)]
pub struct SpotLight {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    cone_angle: f32,
    near: f32,
    far: f32,
}

impl SpotLight {
    pub fn new() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 0.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            cone_angle: 50f32.to_radians(),
            near: 1.0,
            far: 150.0,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
        // Straight up or down: pick another up vector so look_at stays defined
        let direction = (target - self.position).normalize_or_zero();
        self.up = if direction.dot(Vec3::Y).abs() > 0.999 { Vec3::Z } else { Vec3::Y };
    }

    pub fn set_cone_angle(&mut self, radians: f32) {
        self.cone_angle = radians;
    }

    pub fn set_range(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn cone_angle(&self) -> f32 {
        self.cone_angle
    }
}

impl Default for SpotLight {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewpoint for SpotLight {
    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.cone_angle, 1.0, self.near, self.far)
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
