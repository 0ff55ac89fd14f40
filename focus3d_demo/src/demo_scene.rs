/// The fixed demo scene: a few cubes on a ground plane

use std::sync::Arc;

use focus_3d_engine::focus3d::camera::{Camera, SpotLight};
use focus_3d_engine::focus3d::material::{MaterialFactory, MaterialParameterValues};
use focus_3d_engine::focus3d::render::{
    Geometry, GeometryDesc, GraphicsDevice, VertexFormat, VertexLayout,
};
use focus_3d_engine::focus3d::scene::{SceneObject, SimpleScene};
use focus_3d_engine::focus3d::Result;
use glam::{Mat4, Vec3, Vec4};

use crate::shader_loader::SOLID_COLOR_PROGRAM;

/// Interleaved position + normal
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

pub fn vertex_layout() -> VertexLayout {
    VertexLayout::packed(&[VertexFormat::Float32x3, VertexFormat::Float32x3])
}

/// Axis-aligned cube of edge 2 centered on the origin, one quad per face
pub fn cube_desc() -> GeometryDesc {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, u axis, v axis
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(Vertex {
                position: (n + u * su + v * sv).to_array(),
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    GeometryDesc::from_vertices("cube", &vertices, vertex_layout(), indices)
}

/// Square in the XZ plane of edge `2 * half_size`, facing up
pub fn ground_desc(half_size: f32) -> GeometryDesc {
    let up = [0.0, 1.0, 0.0];
    let vertices = [
        Vertex { position: [-half_size, 0.0, half_size], normal: up },
        Vertex { position: [half_size, 0.0, half_size], normal: up },
        Vertex { position: [half_size, 0.0, -half_size], normal: up },
        Vertex { position: [-half_size, 0.0, -half_size], normal: up },
    ];
    GeometryDesc::from_vertices("ground", &vertices, vertex_layout(), vec![0, 1, 2, 0, 2, 3])
}

/// Build the scene: the ground, a large cube at the origin and two smaller
/// cubes at different distances from the camera
pub fn create_demo_scene(
    device: &mut dyn GraphicsDevice,
    factory: &MaterialFactory,
    show_solid: bool,
) -> Result<SimpleScene> {
    let program = factory.program(SOLID_COLOR_PROGRAM)?;
    let cube: Arc<dyn Geometry> = device.create_geometry(&cube_desc())?;
    let ground: Arc<dyn Geometry> = device.create_geometry(&ground_desc(40.0))?;

    let mut scene = SimpleScene::new();
    scene.add_object(
        SceneObject::new(ground, Arc::clone(&program))
            .with_model_matrix(Mat4::from_translation(Vec3::new(0.0, -5.0, 0.0)))
            .with_parameters(MaterialParameterValues::new().with("u_solidColor", Vec4::new(0.6, 0.6, 0.55, 1.0))),
    );

    let cubes = [
        (Vec3::new(0.0, 0.0, 0.0), 5.0, Vec4::new(0.8, 0.25, 0.2, 1.0)),
        (Vec3::new(-14.0, -2.0, 18.0), 3.0, Vec4::new(0.2, 0.5, 0.85, 1.0)),
        (Vec3::new(12.0, -3.0, -20.0), 2.0, Vec4::new(0.3, 0.75, 0.3, 1.0)),
    ];
    for (translation, scale, color) in cubes {
        let mut object = SceneObject::new(Arc::clone(&cube), Arc::clone(&program))
            .with_model_matrix(Mat4::from_translation(translation) * Mat4::from_scale(Vec3::splat(scale)))
            .with_parameters(MaterialParameterValues::new().with("u_solidColor", color));
        if !show_solid {
            object.set_render_mode("solid", false);
        }
        scene.add_object(object);
    }
    Ok(scene)
}

/// Camera at (0, 10, 50) and light at (25, 40, 30), both looking at the origin
pub fn create_viewpoints(width: u32, height: u32) -> (Camera, SpotLight) {
    let mut camera = Camera::new(width as f32 / height.max(1) as f32);
    camera.set_position(Vec3::new(0.0, 10.0, 50.0));
    camera.look_at(Vec3::ZERO);

    let mut light = SpotLight::new();
    light.set_position(Vec3::new(25.0, 40.0, 30.0));
    light.look_at(Vec3::ZERO);

    (camera, light)
}

#[cfg(test)]
#[path = "demo_scene_tests.rs"]
mod tests;
