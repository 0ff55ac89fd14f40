/// Pipeline configuration

/// Fixed parameters of the pass pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Shadow map edge in pixels, independent of the output size
    pub shadow_map_size: u32,
    /// Clear color of the geometry buffer and the scene color target
    pub clear_color: [f32; 4],
    /// Clear color of the shadow map (white = nothing occludes)
    pub shadow_clear_color: [f32; 4],
    /// Render mode the shadow pass asks drawables for
    pub solid_render_mode: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow_map_size: 600,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            shadow_clear_color: [1.0, 1.0, 1.0, 1.0],
            solid_render_mode: "solid".to_string(),
        }
    }
}
