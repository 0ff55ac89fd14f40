/// Full-screen quad renderer for the post-processing passes

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Geometry, GeometryDesc, GraphicsDevice, VertexFormat, VertexLayout};
use crate::material::{MaterialParameterValues, ShaderProgram};

/// x, y (NDC), u, v
const QUAD_VERTICES: [[f32; 4]; 4] = [
    [-1.0, -1.0, 0.0, 0.0],
    [1.0, -1.0, 1.0, 0.0],
    [1.0, 1.0, 1.0, 1.0],
    [-1.0, 1.0, 0.0, 1.0],
];

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Draws one quad covering the whole viewport. Holds nothing but the quad.
pub struct QuadRenderer {
    quad: Arc<dyn Geometry>,
}

impl QuadRenderer {
    pub fn new(device: &mut dyn GraphicsDevice) -> Result<Self> {
        let desc = GeometryDesc::from_vertices(
            "fullscreen_quad",
            &QUAD_VERTICES,
            VertexLayout::packed(&[VertexFormat::Float32x2, VertexFormat::Float32x2]),
            QUAD_INDICES.to_vec(),
        );
        Ok(Self {
            quad: device.create_geometry(&desc)?,
        })
    }

    pub fn geometry(&self) -> &Arc<dyn Geometry> {
        &self.quad
    }

    /// Activate `program`, bind `parameters` (no fallback) and draw the quad once
    pub fn render(
        &self,
        device: &mut dyn GraphicsDevice,
        program: &ShaderProgram,
        parameters: &MaterialParameterValues,
    ) -> Result<()> {
        program.use_program(device)?;
        program.set_material_parameters(device, parameters, &MaterialParameterValues::new())?;
        device.draw_indexed(&self.quad)
    }
}

#[cfg(test)]
#[path = "quad_renderer_tests.rs"]
mod tests;
