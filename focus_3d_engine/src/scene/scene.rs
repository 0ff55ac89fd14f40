/// Scene capabilities the pipeline consumes.
///
/// A scene is an ordered collection of drawables. A drawable is asked, once
/// per pass, for the data needed to draw it under that pass's render
/// options; it can decline with `RenderDataQuery::Absent`.

use std::sync::Arc;

use glam::Mat4;

use crate::graphics_device::Geometry;
use crate::material::{MaterialParameterValues, ShaderProgram};

/// Per-pass request made to every drawable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderOptions {
    /// Render mode, e.g. "solid"
    pub mode: String,
}

impl RenderOptions {
    pub fn new(mode: impl Into<String>) -> Self {
        Self { mode: mode.into() }
    }
}

/// What a drawable contributes to one pass. Borrowed from the drawable,
/// valid for the duration of the pass.
pub struct RenderData<'a> {
    pub model_matrix: Mat4,
    /// Overrides merged over the pass's fallback parameters
    pub material_parameters: &'a MaterialParameterValues,
    pub program: &'a Arc<ShaderProgram>,
    pub geometry: &'a Arc<dyn Geometry>,
}

/// Answer of a drawable to a render-data request
pub enum RenderDataQuery<'a> {
    Present(RenderData<'a>),
    /// Not drawn in this pass
    Absent,
}

impl<'a> RenderDataQuery<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, RenderDataQuery::Present(_))
    }

    pub fn into_option(self) -> Option<RenderData<'a>> {
        match self {
            RenderDataQuery::Present(data) => Some(data),
            RenderDataQuery::Absent => None,
        }
    }
}

pub trait Drawable {
    fn render_data(&self, options: &RenderOptions) -> RenderDataQuery<'_>;
}

pub trait Scene {
    /// Drawables in draw order
    fn objects(&self) -> Box<dyn Iterator<Item = &dyn Drawable> + '_>;
}
