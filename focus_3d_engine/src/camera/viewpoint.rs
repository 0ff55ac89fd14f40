/// Viewpoint: anything the pipeline can render from (camera or light)

use glam::{Mat4, Vec3};

pub trait Viewpoint {
    fn projection_matrix(&self) -> Mat4;

    fn view_matrix(&self) -> Mat4;

    /// World-space eye position
    fn position(&self) -> Vec3;

    fn near(&self) -> f32;

    fn far(&self) -> f32;
}
