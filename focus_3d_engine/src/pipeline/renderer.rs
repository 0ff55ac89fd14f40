/// Renderer - the deferred depth-of-field pipeline.
///
/// Runs, once per frame and in this order:
/// 1. Shadow: scene depth from the light into a fixed-size shadow map
/// 2. Clear: reset the geometry buffer
/// 3. Geometry: diffuse, normal, position and linear depth from the camera
/// 4. Compositing: light the geometry buffer with the shadow map
/// 5. Blur: two separable gaussian iterations (horizontal, then vertical)
/// 6. DepthOfField: blend sharp and blurred images around the focus point
///
/// The renderer owns every intermediate framebuffer and shares the shader
/// programs with the material factory. Size-dependent state only exists
/// between `initialize` and `release`; passes outside that window fail with
/// `NotInitialized`.

use std::sync::Arc;

use glam::{Mat3, Vec2, Vec4};

use crate::error::{Error, Result};
use crate::{engine_bail, engine_debug, engine_info, engine_trace};
use crate::camera::Viewpoint;
use crate::framebuffer::{color_normal_position_attachments, single_color_attachment, Framebuffer};
use crate::graphics_device::{ClearFlags, GraphicsDevice, RenderTarget, Viewport};
use crate::material::{MaterialFactory, MaterialParameterValues, ShaderProgram, TextureReference};
use crate::pipeline::{FocusSettings, FramePass, FrameSequencer, QuadRenderer, RendererConfig};
use crate::scene::{RenderDataQuery, RenderOptions, Scene};

/// Program names the pipeline needs from the material factory
pub const COMPOSITING_PROGRAM: &str = "compositing";
pub const SHADOW_MAP_PROGRAM: &str = "shadowmap";
pub const BLUR_PROGRAM: &str = "gaussian_blur";
pub const DOF_PROGRAM: &str = "dof";

/// Number of separable blur iterations per frame
pub const BLUR_ITERATIONS: usize = 2;

// ===== PUBLIC TYPES =====

/// Where a blur iteration reads its input from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurSource {
    /// The lit scene from the compositing pass
    SceneColor,
    /// The blur framebuffer's own attachment (previous iteration)
    BlurTarget,
}

/// One step of the blur ping-pong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurIteration {
    pub horizontal: bool,
    pub source: BlurSource,
}

/// Everything one frame needs besides the device
pub struct FrameInputs<'a> {
    pub scene: &'a dyn Scene,
    pub camera: &'a dyn Viewpoint,
    pub light: &'a dyn Viewpoint,
    pub render_options: RenderOptions,
    pub focus: FocusSettings,
}

/// Draw counts of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub shadow_draws: usize,
    pub geometry_draws: usize,
}

// ===== INTERNAL STATE =====

struct PipelinePrograms {
    compositing: Arc<ShaderProgram>,
    shadow_map: Arc<ShaderProgram>,
    blur: Arc<ShaderProgram>,
    dof: Arc<ShaderProgram>,
}

/// Size-dependent state, rebuilt as a whole
struct PipelineTargets {
    width: u32,
    height: u32,
    geometry: Framebuffer,
    shadow_map: Framebuffer,
    scene_color: Framebuffer,
    blur: Framebuffer,
    compositing_parameters: MaterialParameterValues,
    dof_parameters: MaterialParameterValues,
}

impl PipelineTargets {
    fn build(device: &mut dyn GraphicsDevice, config: &RendererConfig, width: u32, height: u32) -> Result<Self> {
        let geometry = Framebuffer::new(device, "geometry", width, height, &color_normal_position_attachments())?;
        let shadow_map = Framebuffer::new(
            device,
            "shadow_map",
            config.shadow_map_size,
            config.shadow_map_size,
            &single_color_attachment(),
        )?;
        let scene_color = Framebuffer::new(device, "scene_color", width, height, &single_color_attachment())?;
        let blur = Framebuffer::new(device, "blur", width, height, &single_color_attachment())?;

        let compositing_parameters = MaterialParameterValues::new()
            .with("u_diffuse", geometry.color_attachment(0)?)
            .with("u_normal", geometry.color_attachment(1)?)
            .with("u_position", geometry.color_attachment(2)?)
            .with("u_depthMap", geometry.color_attachment(3)?)
            .with("u_shadowMap", shadow_map.color_attachment(0)?);

        let dof_parameters = MaterialParameterValues::new()
            .with("u_scene", scene_color.color_attachment(0)?)
            .with("u_blur", blur.color_attachment(0)?)
            .with("u_depthMap", geometry.color_attachment(3)?)
            .with("u_focusUV", FocusSettings::default().focus_uv)
            .with("u_focusRange", FocusSettings::default().focus_range);

        Ok(Self {
            width,
            height,
            geometry,
            shadow_map,
            scene_color,
            blur,
            compositing_parameters,
            dof_parameters,
        })
    }

    fn viewport(&self) -> Viewport {
        Viewport::full(self.width, self.height)
    }
}

fn require_targets(targets: &Option<PipelineTargets>) -> Result<&PipelineTargets> {
    match targets {
        Some(targets) => Ok(targets),
        None => engine_bail!("focus3d::Renderer", error = Error::NotInitialized),
    }
}

// ===== RENDERER =====

pub struct Renderer {
    config: RendererConfig,
    programs: PipelinePrograms,
    quad: QuadRenderer,
    targets: Option<PipelineTargets>,
    sequencer: FrameSequencer,
}

impl Renderer {
    /// Resolve the pipeline programs and create the full-screen quad
    ///
    /// No framebuffer exists until `initialize`.
    ///
    /// # Errors
    ///
    /// `ResourceResolution` when the factory lacks one of the pipeline programs.
    pub fn new(device: &mut dyn GraphicsDevice, factory: &MaterialFactory, config: RendererConfig) -> Result<Self> {
        let programs = PipelinePrograms {
            compositing: factory.program(COMPOSITING_PROGRAM)?,
            shadow_map: factory.program(SHADOW_MAP_PROGRAM)?,
            blur: factory.program(BLUR_PROGRAM)?,
            dof: factory.program(DOF_PROGRAM)?,
        };
        let quad = QuadRenderer::new(device)?;

        Ok(Self {
            config,
            programs,
            quad,
            targets: None,
            sequencer: FrameSequencer::new(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    // ===== LIFECYCLE =====

    /// Build (or rebuild) every size-dependent resource for a `width` x `height` output
    ///
    /// Waits for the device to finish in-flight work, drops the old
    /// framebuffers, then creates new ones. If creation fails the renderer
    /// stays torn down.
    pub fn initialize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            engine_bail!("focus3d::Renderer", error = Error::InvalidResource(
                format!("Cannot initialize pipeline at {}x{}", width, height)));
        }

        device.wait_idle()?;
        self.targets = None;
        self.sequencer.reset();

        self.targets = Some(PipelineTargets::build(device, &self.config, width, height)?);
        engine_info!("focus3d::Renderer", "Pipeline initialized at {}x{} (shadow map {}x{})",
            width, height, self.config.shadow_map_size, self.config.shadow_map_size);
        Ok(())
    }

    /// Tear down every size-dependent resource
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        device.wait_idle()?;
        if self.targets.take().is_some() {
            engine_debug!("focus3d::Renderer", "Pipeline released");
        }
        self.sequencer.reset();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.targets.is_some()
    }

    /// Output size, if initialized
    pub fn size(&self) -> Option<(u32, u32)> {
        self.targets.as_ref().map(|t| (t.width, t.height))
    }

    /// Last pass that ran in the current frame
    pub fn last_pass(&self) -> Option<FramePass> {
        self.sequencer.last()
    }

    // ===== FRAMEBUFFER ACCESS =====

    pub fn geometry_framebuffer(&self) -> Option<&Framebuffer> {
        self.targets.as_ref().map(|t| &t.geometry)
    }

    pub fn shadow_map_framebuffer(&self) -> Option<&Framebuffer> {
        self.targets.as_ref().map(|t| &t.shadow_map)
    }

    pub fn scene_color_framebuffer(&self) -> Option<&Framebuffer> {
        self.targets.as_ref().map(|t| &t.scene_color)
    }

    pub fn blur_framebuffer(&self) -> Option<&Framebuffer> {
        self.targets.as_ref().map(|t| &t.blur)
    }

    /// The blur iterations of every frame, in order
    pub fn blur_schedule() -> [BlurIteration; BLUR_ITERATIONS] {
        let mut schedule = [BlurIteration { horizontal: true, source: BlurSource::SceneColor }; BLUR_ITERATIONS];
        let mut horizontal = true;
        for (index, iteration) in schedule.iter_mut().enumerate() {
            iteration.horizontal = horizontal;
            iteration.source = if index == 0 { BlurSource::SceneColor } else { BlurSource::BlurTarget };
            horizontal = !horizontal;
        }
        schedule
    }

    // ===== FRAME =====

    /// Run the six passes in order inside one device frame
    pub fn render_frame(&mut self, device: &mut dyn GraphicsDevice, inputs: &FrameInputs<'_>) -> Result<FrameStats> {
        device.begin_frame()?;

        let shadow_draws = self.shadow_pass(device, inputs.scene, inputs.light)?;
        self.clear(device)?;
        let geometry_draws = self.geometry_pass(device, inputs.scene, inputs.camera, &inputs.render_options)?;
        self.compositing_pass(device, inputs.light)?;
        self.blur_pass(device)?;
        self.dof_pass(device, inputs.focus.focus_uv, inputs.focus.focus_range)?;

        device.end_frame()?;
        Ok(FrameStats { shadow_draws, geometry_draws })
    }

    // ===== PASSES =====

    /// Render light-space depth of every solid drawable into the shadow map
    ///
    /// Returns the number of draws issued.
    pub fn shadow_pass(&mut self, device: &mut dyn GraphicsDevice, scene: &dyn Scene, light: &dyn Viewpoint) -> Result<usize> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::Shadow)?;
        engine_trace!("focus3d::Renderer", "Shadow pass");

        device.set_depth_test(true);
        let mut bound = targets.shadow_map.bind(device)?;
        bound.device().set_viewport(Viewport::full(targets.shadow_map.width(), targets.shadow_map.height()));
        bound.device().set_clear_color(self.config.shadow_clear_color);
        bound.device().clear(ClearFlags::COLOR | ClearFlags::DEPTH)?;
        bound.set_draw_buffers()?;

        let mut parameters = MaterialParameterValues::new()
            .with("u_projMat", light.projection_matrix())
            .with("u_viewMat", light.view_matrix())
            .with("u_viewPos", light.position());
        let empty = MaterialParameterValues::new();
        let options = RenderOptions::new(self.config.solid_render_mode.clone());

        self.programs.shadow_map.use_program(bound.device())?;
        let mut draws = 0;
        for drawable in scene.objects() {
            if let RenderDataQuery::Present(data) = drawable.render_data(&options) {
                parameters.set("u_modelMat", data.model_matrix);
                parameters.set("u_normalMat", Mat3::from_mat4(data.model_matrix));
                self.programs.shadow_map.set_material_parameters(bound.device(), &parameters, &empty)?;
                bound.device().draw_indexed(data.geometry)?;
                draws += 1;
            }
        }

        bound.unbind()?;
        Ok(draws)
    }

    /// Clear the geometry buffer's color and depth
    pub fn clear(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::Clear)?;

        let mut bound = targets.geometry.bind(device)?;
        bound.device().set_clear_color(self.config.clear_color);
        bound.device().clear(ClearFlags::COLOR | ClearFlags::DEPTH)?;
        bound.unbind()
    }

    /// Fill the geometry buffer from the camera
    ///
    /// Drawables answering `Absent` for `options` are skipped. Returns the
    /// number of draws issued.
    pub fn geometry_pass(
        &mut self,
        device: &mut dyn GraphicsDevice,
        scene: &dyn Scene,
        camera: &dyn Viewpoint,
        options: &RenderOptions,
    ) -> Result<usize> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::Geometry)?;
        engine_trace!("focus3d::Renderer", "Geometry pass ({})", options.mode);

        device.set_depth_test(true);
        device.set_viewport(targets.viewport());
        let mut bound = targets.geometry.bind(device)?;
        bound.set_draw_buffers()?;

        let mut fallback = MaterialParameterValues::new()
            .with("u_projMat", camera.projection_matrix())
            .with("u_viewMat", camera.view_matrix())
            .with("u_solidColor", Vec4::new(0.0, 0.0, 0.0, 1.0))
            .with("u_viewPos", camera.position())
            .with("u_near", camera.near())
            .with("u_far", camera.far());

        let mut draws = 0;
        for drawable in scene.objects() {
            if let RenderDataQuery::Present(data) = drawable.render_data(options) {
                fallback.set("u_modelMat", data.model_matrix);
                fallback.set("u_normalMat", Mat3::from_mat4(data.model_matrix));
                data.program.use_program(bound.device())?;
                data.program.set_material_parameters(bound.device(), data.material_parameters, &fallback)?;
                bound.device().draw_indexed(data.geometry)?;
                draws += 1;
            }
        }

        bound.unbind()?;
        Ok(draws)
    }

    /// Light the geometry buffer into the scene color target
    pub fn compositing_pass(&mut self, device: &mut dyn GraphicsDevice, light: &dyn Viewpoint) -> Result<()> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::Compositing)?;

        device.set_depth_test(false);
        device.set_viewport(targets.viewport());
        let mut bound = targets.scene_color.bind(device)?;
        bound.set_draw_buffers()?;
        bound.device().set_clear_color(self.config.clear_color);
        bound.device().clear(ClearFlags::COLOR)?;

        let mut parameters = targets.compositing_parameters.clone();
        parameters.set("u_lightPos", light.position());
        parameters.set("u_lightMat", light.view_matrix());
        parameters.set("u_lightProjMat", light.projection_matrix());

        self.quad.render(bound.device(), &self.programs.compositing, &parameters)?;
        bound.unbind()
    }

    /// Separable gaussian blur of the scene color into the blur target
    pub fn blur_pass(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::Blur)?;

        for iteration in Self::blur_schedule() {
            let source: TextureReference = match iteration.source {
                BlurSource::SceneColor => targets.scene_color.color_attachment(0)?,
                BlurSource::BlurTarget => targets.blur.color_attachment(0)?,
            };
            let parameters = MaterialParameterValues::new()
                .with("u_image", source)
                .with("u_horizontal", iteration.horizontal);

            let mut bound = targets.blur.bind(&mut *device)?;
            bound.set_draw_buffers()?;
            self.quad.render(bound.device(), &self.programs.blur, &parameters)?;
            bound.unbind()?;
        }
        Ok(())
    }

    /// Blend sharp and blurred scene into the default target around the focus point
    pub fn dof_pass(&mut self, device: &mut dyn GraphicsDevice, focus_uv: Vec2, focus_range: f32) -> Result<()> {
        let targets = require_targets(&self.targets)?;
        self.sequencer.advance(FramePass::DepthOfField)?;

        device.bind_render_target(RenderTarget::Default)?;
        device.set_viewport(targets.viewport());

        let mut parameters = targets.dof_parameters.clone();
        parameters.set("u_focusUV", focus_uv);
        parameters.set("u_focusRange", focus_range);

        self.quad.render(device, &self.programs.dof, &parameters)
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
