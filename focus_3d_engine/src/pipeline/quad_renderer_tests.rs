/// Unit tests for QuadRenderer

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockUniform};
use crate::graphics_device::{
    ActiveUniform, Geometry, PrimitiveTopology, ShaderModuleDesc, ShaderProgramDesc, ShaderStage,
    UniformKind,
};
use crate::material::{MaterialParameterValues, ShaderProgram};
use crate::pipeline::QuadRenderer;

fn blur_program(device: &mut MockGraphicsDevice) -> ShaderProgram {
    ShaderProgram::create(device, &ShaderProgramDesc {
        name: "gaussian_blur".to_string(),
        vertex: ShaderModuleDesc::new(ShaderStage::Vertex, vec![]),
        fragment: ShaderModuleDesc::new(ShaderStage::Fragment, vec![]),
        uniforms: vec![ActiveUniform::new("u_horizontal", UniformKind::Bool)],
    })
    .unwrap()
}

#[test]
fn test_quad_geometry() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let quad = QuadRenderer::new(&mut device).unwrap();
    let geometry = quad.geometry();

    assert_eq!(geometry.index_count(), 6);
    assert_eq!(geometry.topology(), PrimitiveTopology::TriangleList);
    // position + uv
    assert_eq!(geometry.layout().attributes.len(), 2);
    assert_eq!(geometry.layout().stride, 16);
}

#[test]
fn test_render_issues_exactly_one_draw() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let quad = QuadRenderer::new(&mut device).unwrap();
    let program = blur_program(&mut device);
    let parameters = MaterialParameterValues::new().with("u_horizontal", true);

    quad.render(&mut device, &program, &parameters).unwrap();

    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].program, "gaussian_blur");
    assert_eq!(draws[0].geometry, "fullscreen_quad");
    assert_eq!(draws[0].uniforms["u_horizontal"], MockUniform::Bool(true));
}

#[test]
fn test_render_without_parameter_fails_before_drawing() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let quad = QuadRenderer::new(&mut device).unwrap();
    let program = blur_program(&mut device);

    let result = quad.render(&mut device, &program, &MaterialParameterValues::new());

    assert!(matches!(result, Err(Error::MissingParameter { .. })));
    assert!(device.draws().is_empty());
}
