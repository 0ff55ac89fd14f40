/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Records every state change and draw as a `MockCommand` so tests can check
/// pass sequencing, bound targets and the uniforms each draw saw. It is as
/// strict as a real backend: uniforms must match the active program's
/// interface and every active uniform must be set before a draw.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::{Error, Result};
use crate::graphics_device::{
    ActiveUniform, BoundTarget, ClearFlags, FramebufferDesc, Geometry, GeometryDesc, GraphicsDevice,
    InternalFormat, NativeFramebuffer, NativeProgram, PrimitiveTopology, RenderTarget, ResourceId,
    ShaderProgramDesc, Texture, TextureDesc, TextureInfo, UniformValue, VertexLayout, Viewport,
};

// ============================================================================
// Mock resources
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub id: ResourceId,
    pub name: String,
    pub info: TextureInfo,
}

impl Texture for MockTexture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockFramebuffer {
    pub id: ResourceId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub color_formats: Vec<InternalFormat>,
    pub depth_format: Option<InternalFormat>,
    pub color_ids: Vec<ResourceId>,
}

impl NativeFramebuffer for MockFramebuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_formats(&self) -> &[InternalFormat] {
        &self.color_formats
    }

    fn depth_format(&self) -> Option<InternalFormat> {
        self.depth_format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockProgram {
    pub id: ResourceId,
    pub name: String,
    pub uniforms: Vec<ActiveUniform>,
}

impl NativeProgram for MockProgram {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn active_uniforms(&self) -> &[ActiveUniform] {
        &self.uniforms
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockGeometry {
    pub id: ResourceId,
    pub name: String,
    pub index_count: u32,
    pub layout: VertexLayout,
    pub topology: PrimitiveTopology,
}

impl Geometry for MockGeometry {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn index_count(&self) -> u32 {
        self.index_count
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Recorded commands
// ============================================================================

/// Uniform value as the mock saw it
#[derive(Debug, Clone, PartialEq)]
pub enum MockUniform {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Bool(bool),
    Texture { texture: ResourceId, unit: u32 },
}

impl From<&UniformValue<'_>> for MockUniform {
    fn from(value: &UniformValue<'_>) -> Self {
        match value {
            UniformValue::Float(v) => MockUniform::Float(*v),
            UniformValue::Vec2(v) => MockUniform::Vec2(*v),
            UniformValue::Vec3(v) => MockUniform::Vec3(*v),
            UniformValue::Vec4(v) => MockUniform::Vec4(*v),
            UniformValue::Mat3(v) => MockUniform::Mat3(*v),
            UniformValue::Mat4(v) => MockUniform::Mat4(*v),
            UniformValue::Bool(v) => MockUniform::Bool(*v),
            UniformValue::Texture { texture, unit } => MockUniform::Texture {
                texture: texture.id(),
                unit: *unit,
            },
        }
    }
}

/// Snapshot of the state a draw ran with
#[derive(Debug, Clone, PartialEq)]
pub struct MockDraw {
    pub target: BoundTarget,
    pub program: String,
    pub geometry: String,
    pub depth_test: bool,
    pub viewport: Viewport,
    pub draw_buffers: u32,
    pub uniforms: BTreeMap<String, MockUniform>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    BindTarget(BoundTarget),
    SetDrawBuffers(u32),
    SetViewport(Viewport),
    SetDepthTest(bool),
    SetClearColor([f32; 4]),
    Clear {
        target: BoundTarget,
        flags: ClearFlags,
        color: [f32; 4],
    },
    UseProgram(String),
    Draw(MockDraw),
    BeginFrame,
    EndFrame,
    WaitIdle,
}

// ============================================================================
// Mock device
// ============================================================================

pub struct MockGraphicsDevice {
    pub commands: Vec<MockCommand>,
    /// Every texture ever created, in creation order
    pub created_textures: Vec<TextureInfo>,
    /// When set, the next draw fails with this error
    pub fail_next_draw: Option<Error>,
    /// When set, program creation fails with this error
    pub fail_program_creation: Option<Error>,
    bound: BoundTarget,
    bound_attachment_count: u32,
    draw_buffers: u32,
    viewport: Viewport,
    depth_test: bool,
    clear_color: [f32; 4],
    program: Option<Arc<dyn NativeProgram>>,
    uniforms: BTreeMap<String, MockUniform>,
    default_size: (u32, u32),
}

impl MockGraphicsDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            commands: Vec::new(),
            created_textures: Vec::new(),
            fail_next_draw: None,
            fail_program_creation: None,
            bound: BoundTarget::Default,
            bound_attachment_count: 1,
            draw_buffers: 1,
            viewport: Viewport::full(width, height),
            depth_test: false,
            clear_color: [0.0; 4],
            program: None,
            uniforms: BTreeMap::new(),
            default_size: (width, height),
        }
    }

    /// All recorded draws, in order
    pub fn draws(&self) -> Vec<&MockDraw> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    /// Draws issued with `program` active
    pub fn draws_with(&self, program: &str) -> Vec<&MockDraw> {
        self.draws().into_iter().filter(|d| d.program == program).collect()
    }

    pub fn draws_to(&self, target: BoundTarget) -> Vec<&MockDraw> {
        self.draws().into_iter().filter(|d| d.target == target).collect()
    }

    /// Recorded clears as (target, flags, color)
    pub fn clears(&self) -> Vec<(BoundTarget, ClearFlags, [f32; 4])> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Clear { target, flags, color } => Some((*target, *flags, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Change the default target size (what a window resize would do)
    pub fn resize_default_target(&mut self, width: u32, height: u32) {
        self.default_size = (width, height);
    }

    fn texture(&mut self, desc: &TextureDesc) -> Arc<dyn Texture> {
        let info = TextureInfo::from(desc);
        self.created_textures.push(info.clone());
        Arc::new(MockTexture {
            id: ResourceId::next(),
            name: desc.name.clone(),
            info,
        })
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Arc<dyn Texture>> {
        desc.validate().map_err(Error::InvalidResource)?;
        Ok(self.texture(desc))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn NativeFramebuffer>> {
        desc.validate().map_err(Error::InvalidResource)?;
        Ok(Arc::new(MockFramebuffer {
            id: ResourceId::next(),
            name: desc.name.to_string(),
            width: desc.width,
            height: desc.height,
            color_formats: desc
                .color_attachments
                .iter()
                .map(|t| t.info().internal_format)
                .collect(),
            depth_format: desc.depth_attachment.map(|t| t.info().internal_format),
            color_ids: desc.color_attachments.iter().map(|t| t.id()).collect(),
        }))
    }

    fn create_program(&mut self, desc: &ShaderProgramDesc) -> Result<Arc<dyn NativeProgram>> {
        if let Some(error) = self.fail_program_creation.take() {
            return Err(error);
        }
        Ok(Arc::new(MockProgram {
            id: ResourceId::next(),
            name: desc.name.clone(),
            uniforms: desc.uniforms.clone(),
        }))
    }

    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<Arc<dyn Geometry>> {
        desc.validate().map_err(Error::InvalidResource)?;
        Ok(Arc::new(MockGeometry {
            id: ResourceId::next(),
            name: desc.name.clone(),
            index_count: desc.indices.len() as u32,
            layout: desc.layout.clone(),
            topology: desc.topology,
        }))
    }

    fn bind_render_target(&mut self, target: RenderTarget<'_>) -> Result<()> {
        self.bound = BoundTarget::from(target);
        self.bound_attachment_count = match target {
            RenderTarget::Default => 1,
            RenderTarget::Offscreen(framebuffer) => framebuffer.color_formats().len() as u32,
        };
        self.draw_buffers = 1;
        self.commands.push(MockCommand::BindTarget(self.bound));
        Ok(())
    }

    fn bound_target(&self) -> BoundTarget {
        self.bound
    }

    fn set_draw_buffers(&mut self, count: u32) -> Result<()> {
        if count == 0 || count > self.bound_attachment_count {
            return Err(Error::GraphicsApi(format!(
                "set_draw_buffers({}) with {} attachments bound",
                count, self.bound_attachment_count
            )));
        }
        self.draw_buffers = count;
        self.commands.push(MockCommand::SetDrawBuffers(count));
        Ok(())
    }

    fn default_target_size(&self) -> (u32, u32) {
        self.default_size
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.commands.push(MockCommand::SetViewport(viewport));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(MockCommand::SetDepthTest(enabled));
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
        self.commands.push(MockCommand::SetClearColor(color));
    }

    fn clear(&mut self, flags: ClearFlags) -> Result<()> {
        self.commands.push(MockCommand::Clear {
            target: self.bound,
            flags,
            color: self.clear_color,
        });
        Ok(())
    }

    fn use_program(&mut self, program: &Arc<dyn NativeProgram>) -> Result<()> {
        self.program = Some(Arc::clone(program));
        self.uniforms.clear();
        self.commands.push(MockCommand::UseProgram(program.name().to_string()));
        Ok(())
    }

    fn set_uniform(&mut self, uniform: &ActiveUniform, value: UniformValue<'_>) -> Result<()> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| Error::GraphicsApi(format!("set_uniform('{}') with no program", uniform.name)))?;
        let declared = program
            .active_uniforms()
            .iter()
            .find(|u| u.name == uniform.name)
            .ok_or_else(|| {
                Error::GraphicsApi(format!(
                    "program '{}' has no uniform '{}'",
                    program.name(),
                    uniform.name
                ))
            })?;
        if declared.kind != value.kind() {
            return Err(Error::GraphicsApi(format!(
                "uniform '{}' is {}, got {}",
                uniform.name,
                declared.kind,
                value.kind()
            )));
        }
        self.uniforms.insert(uniform.name.clone(), MockUniform::from(&value));
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: &Arc<dyn Geometry>) -> Result<()> {
        if let Some(error) = self.fail_next_draw.take() {
            return Err(error);
        }
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| Error::GraphicsApi("draw with no program".to_string()))?;
        if let Some(missing) = program
            .active_uniforms()
            .iter()
            .find(|u| !self.uniforms.contains_key(&u.name))
        {
            return Err(Error::GraphicsApi(format!(
                "draw with program '{}' but uniform '{}' never set",
                program.name(),
                missing.name
            )));
        }
        let draw = MockDraw {
            target: self.bound,
            program: program.name().to_string(),
            geometry: geometry.name().to_string(),
            depth_test: self.depth_test,
            viewport: self.viewport,
            draw_buffers: self.draw_buffers,
            uniforms: self.uniforms.clone(),
        };
        self.commands.push(MockCommand::Draw(draw));
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.commands.push(MockCommand::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.commands.push(MockCommand::EndFrame);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.commands.push(MockCommand::WaitIdle);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
