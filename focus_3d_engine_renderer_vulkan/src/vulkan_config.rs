/// Configuration of the headless Vulkan device

/// Validation messages shown by the debug callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    /// Append to the file at this path
    File(String),
    Both(String),
}

/// Vulkan backend configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the driver
    pub app_name: String,
    /// Enable VK_LAYER_KHRONOS_validation (needs the `vulkan-validation` feature)
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Size of the default render target
    pub width: u32,
    pub height: u32,
    /// Bytes of uniform data a single frame may record
    pub uniform_arena_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Focus3D Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            break_on_validation_error: false,
            width: 800,
            height: 600,
            uniform_arena_size: 4 * 1024 * 1024,
        }
    }
}
