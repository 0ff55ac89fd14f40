/// Demo configuration: command line and runtime toggles

use std::path::PathBuf;

use clap::Parser;
use focus_3d_engine::engine_info;
use focus_3d_engine::focus3d::render::FocusSettings;

/// Render the depth-of-field demo scene offscreen and save the result as PNG
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Directory holding `<program>.vert.spv` / `<program>.frag.spv`
    #[arg(long, default_value = "focus3d_demo/shaders/spv")]
    pub shader_dir: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = "focus3d.png")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Frames to render; the camera orbits a little between frames
    #[arg(short, long, default_value_t = 1)]
    pub frames: u32,

    /// Focus on this pixel (x, origin top-left)
    #[arg(long, requires = "focus_y")]
    pub focus_x: Option<f32>,

    /// Focus on this pixel (y, origin top-left)
    #[arg(long, requires = "focus_x")]
    pub focus_y: Option<f32>,

    /// Narrow the focus band this many steps (negative widens)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub focus_steps: i32,

    /// Hide the solid objects (only the ground is drawn)
    #[arg(long)]
    pub hide_solid: bool,
}

/// Runtime state of the demo
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub focus: FocusSettings,
    pub show_solid: bool,
    pub frames: u32,
    pub shader_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            focus: FocusSettings::default(),
            show_solid: true,
            frames: 1,
            shader_dir: PathBuf::from("focus3d_demo/shaders/spv"),
            output: PathBuf::from("focus3d.png"),
        }
    }
}

impl DemoConfig {
    /// Apply the command line the way the interactive controls would
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self {
            frames: args.frames.max(1),
            shader_dir: args.shader_dir.clone(),
            output: args.output.clone(),
            ..Self::default()
        };

        if let (Some(x), Some(y)) = (args.focus_x, args.focus_y) {
            config.focus.set_focus_from_cursor(x, y, args.width, args.height);
        }
        for _ in 0..args.focus_steps.unsigned_abs() {
            if args.focus_steps > 0 {
                config.focus.narrow_focus();
            } else {
                config.focus.widen_focus();
            }
        }
        if args.hide_solid {
            toggle("Solid", &mut config.show_solid);
        }
        config
    }
}

/// Flip a boolean option and log its new state
pub fn toggle(name: &str, value: &mut bool) {
    *value = !*value;
    engine_info!("focus3d::Demo", "{}: {}", name, if *value { "ON" } else { "OFF" });
}

#[cfg(test)]
#[path = "demo_config_tests.rs"]
mod tests;
