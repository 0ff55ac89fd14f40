/// SceneObject - one drawable mesh with its material and transform.

use std::sync::Arc;

use glam::Mat4;
use rustc_hash::FxHashSet;

use crate::graphics_device::Geometry;
use crate::material::{MaterialParameterValues, ShaderProgram};
use super::scene::{Drawable, RenderData, RenderDataQuery, RenderOptions};

pub struct SceneObject {
    geometry: Arc<dyn Geometry>,
    program: Arc<ShaderProgram>,
    material_parameters: MaterialParameterValues,
    model_matrix: Mat4,
    /// Render modes this object takes part in
    render_modes: FxHashSet<String>,
}

impl SceneObject {
    /// Object drawn in the "solid" mode with an identity transform
    pub fn new(geometry: Arc<dyn Geometry>, program: Arc<ShaderProgram>) -> Self {
        let mut render_modes = FxHashSet::default();
        render_modes.insert("solid".to_string());
        Self {
            geometry,
            program,
            material_parameters: MaterialParameterValues::new(),
            model_matrix: Mat4::IDENTITY,
            render_modes,
        }
    }

    pub fn with_parameters(mut self, parameters: MaterialParameterValues) -> Self {
        self.material_parameters = parameters;
        self
    }

    pub fn with_model_matrix(mut self, model_matrix: Mat4) -> Self {
        self.model_matrix = model_matrix;
        self
    }

    pub fn set_model_matrix(&mut self, model_matrix: Mat4) {
        self.model_matrix = model_matrix;
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn material_parameters(&self) -> &MaterialParameterValues {
        &self.material_parameters
    }

    pub fn material_parameters_mut(&mut self) -> &mut MaterialParameterValues {
        &mut self.material_parameters
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    /// Take part in (or leave) a render mode
    pub fn set_render_mode(&mut self, mode: &str, enabled: bool) {
        if enabled {
            self.render_modes.insert(mode.to_string());
        } else {
            self.render_modes.remove(mode);
        }
    }

    pub fn has_render_mode(&self, mode: &str) -> bool {
        self.render_modes.contains(mode)
    }
}

impl Drawable for SceneObject {
    fn render_data(&self, options: &RenderOptions) -> RenderDataQuery<'_> {
        if !self.render_modes.contains(&options.mode) {
            return RenderDataQuery::Absent;
        }
        RenderDataQuery::Present(RenderData {
            model_matrix: self.model_matrix,
            material_parameters: &self.material_parameters,
            program: &self.program,
            geometry: &self.geometry,
        })
    }
}
