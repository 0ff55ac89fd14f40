/// GraphicsDevice trait - the render context every pass talks to
///
/// The device owns all GPU-global state: the currently bound render target,
/// the draw-buffer configuration, viewport, depth test, clear color and the
/// active program. Nothing else in the crate mutates that state, and the
/// framebuffer bind guard is the only code that changes the bound target.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::error::Result;
use crate::graphics_device::{
    ActiveUniform, FramebufferDesc, Geometry, GeometryDesc, NativeFramebuffer, NativeProgram,
    ShaderProgramDesc, Texture, TextureDesc, UniformValue,
};

// ===== IDS =====

/// Process-unique id of a device resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    /// Allocate a fresh id (backends call this once per created resource)
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ===== STATE TYPES =====

/// Target for `bind_render_target`
#[derive(Clone, Copy)]
pub enum RenderTarget<'a> {
    /// The screen (or the backend's stand-in for it)
    Default,
    Offscreen(&'a Arc<dyn NativeFramebuffer>),
}

/// What is bound right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundTarget {
    Default,
    Offscreen(ResourceId),
}

impl From<RenderTarget<'_>> for BoundTarget {
    fn from(target: RenderTarget<'_>) -> Self {
        match target {
            RenderTarget::Default => BoundTarget::Default,
            RenderTarget::Offscreen(framebuffer) => BoundTarget::Offscreen(framebuffer.id()),
        }
    }
}

bitflags! {
    /// Buffers affected by `clear`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

/// Viewport rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport covering `width` x `height` from the origin
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

// ===== DEVICE TRAIT =====

/// Render context abstraction
///
/// Resource objects are reference-counted and free their GPU memory when the
/// last `Arc` drops. State-setting calls apply to subsequent draws only.
pub trait GraphicsDevice {
    // ----- resources -----

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Arc<dyn Texture>>;

    fn create_framebuffer(&mut self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn NativeFramebuffer>>;

    /// Compile and link a program. Compilation problems are reported here as
    /// `Error::ShaderCompilation`, never later at use time.
    fn create_program(&mut self, desc: &ShaderProgramDesc) -> Result<Arc<dyn NativeProgram>>;

    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<Arc<dyn Geometry>>;

    // ----- render target -----

    /// Make `target` the destination of subsequent clears and draws
    fn bind_render_target(&mut self, target: RenderTarget<'_>) -> Result<()>;

    fn bound_target(&self) -> BoundTarget;

    /// Route fragment outputs 0..count to color attachments 0..count of the bound target
    fn set_draw_buffers(&mut self, count: u32) -> Result<()>;

    /// Size of the default target in pixels
    fn default_target_size(&self) -> (u32, u32);

    // ----- fixed-function state -----

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_depth_test(&mut self, enabled: bool);

    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Clear the bound target's color attachments and/or depth
    fn clear(&mut self, flags: ClearFlags) -> Result<()>;

    // ----- programs and uniforms -----

    fn use_program(&mut self, program: &Arc<dyn NativeProgram>) -> Result<()>;

    /// Set one uniform of the active program
    fn set_uniform(&mut self, uniform: &ActiveUniform, value: UniformValue<'_>) -> Result<()>;

    // ----- drawing -----

    /// One indexed draw of `geometry` with the active program and uniforms
    fn draw_indexed(&mut self, geometry: &Arc<dyn Geometry>) -> Result<()>;

    // ----- frame -----

    fn begin_frame(&mut self) -> Result<()>;

    /// Submit everything recorded since `begin_frame`
    fn end_frame(&mut self) -> Result<()>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&mut self) -> Result<()>;
}
