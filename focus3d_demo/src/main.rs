//! Focus3D demo
//!
//! Renders a few cubes on a ground plane through the deferred depth-of-field
//! pipeline into the headless Vulkan device, then writes the final image to
//! a PNG file.
//!
//! The shaders are GLSL sources under `focus3d_demo/shaders/`. Compile them to
//! SPIR-V once before running:
//!
//! ```text
//! cd focus3d_demo/shaders
//! mkdir -p spv
//! for s in *.vert *.frag; do glslc "$s" -o "spv/$s.spv"; done
//! ```
//!
//! Exit code: 0 on success, 3 when a shader fails to load or compile, 2 on a
//! GPU failure, 1 otherwise.

mod demo_config;
mod demo_scene;
mod shader_loader;

use clap::Parser;
use focus_3d_engine::focus3d::material::MaterialFactory;
use focus_3d_engine::focus3d::render::{FrameInputs, GraphicsDevice, Renderer, RendererConfig};
use focus_3d_engine::focus3d::scene::RenderOptions;
use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::{engine_debug, engine_error, engine_info};
use focus_3d_engine_renderer_vulkan::focus3d::{Config, VulkanGraphicsDevice};
use glam::{Vec2, Vec3};

use demo_config::{Args, DemoConfig};

/// Yaw applied to the camera between two frames
const ORBIT_STEP: f32 = 0.05;

fn main() {
    let args = Args::parse();
    let config = DemoConfig::from_args(&args);

    if let Err(err) = run(&config, args.width, args.height) {
        engine_error!("focus3d::Demo", "{}", err);
        std::process::exit(err.exit_code());
    }
}

fn run(config: &DemoConfig, width: u32, height: u32) -> Result<()> {
    let mut device = VulkanGraphicsDevice::new(Config {
        app_name: "Focus3D Demo".to_string(),
        width,
        height,
        ..Config::default()
    })?;

    let mut factory = MaterialFactory::new();
    shader_loader::load_programs(&mut device, &mut factory, &config.shader_dir)?;

    let scene = demo_scene::create_demo_scene(&mut device, &factory, config.show_solid)?;
    let (mut camera, light) = demo_scene::create_viewpoints(width, height);

    let mut renderer = Renderer::new(&mut device, &factory, RendererConfig::default())?;
    renderer.initialize(&mut device, width, height)?;

    let render_options = RenderOptions::new(renderer.config().solid_render_mode.clone());
    for frame in 0..config.frames {
        if frame > 0 {
            camera.orbit(Vec2::new(ORBIT_STEP, 0.0), Vec3::ZERO);
        }
        let stats = renderer.render_frame(&mut device, &FrameInputs {
            scene: &scene,
            camera: &camera,
            light: &light,
            render_options: render_options.clone(),
            focus: config.focus,
        })?;
        engine_debug!("focus3d::Demo", "Frame {}: {} shadow draws, {} geometry draws",
            frame, stats.shadow_draws, stats.geometry_draws);
    }

    let pixels = device.read_default_target()?;
    renderer.release(&mut device)?;

    let (width, height) = device.default_target_size();
    let mut image = image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        Error::InvalidResource(format!("Readback does not hold a {}x{} RGBA8 image", width, height))
    })?;
    // Rows come back bottom-up
    image::imageops::flip_vertical_in_place(&mut image);
    image.save(&config.output).map_err(|e| {
        Error::InvalidResource(format!("Cannot write {}: {}", config.output.display(), e))
    })?;

    engine_info!("focus3d::Demo", "Rendered {} frame(s) at {}x{} to {}",
        config.frames, width, height, config.output.display());
    Ok(())
}
