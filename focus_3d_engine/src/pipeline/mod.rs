/// Pipeline module - pass orchestration, the full-screen quad and focus state

pub mod quad_renderer;
pub mod frame_sequencer;
pub mod focus;
pub mod renderer_config;
pub mod renderer;

pub use quad_renderer::QuadRenderer;
pub use frame_sequencer::{FramePass, FrameSequencer};
pub use focus::{FocusSettings, FOCUS_RANGE_STEP, MIN_FOCUS_RANGE};
pub use renderer_config::RendererConfig;
pub use renderer::{
    BlurIteration, BlurSource, FrameInputs, FrameStats, Renderer, BLUR_ITERATIONS, BLUR_PROGRAM,
    COMPOSITING_PROGRAM, DOF_PROGRAM, SHADOW_MAP_PROGRAM,
};
