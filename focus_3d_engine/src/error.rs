//! Error types for the Focus3D engine
//!
//! Every error in this crate is fatal at the frame level: the pipeline makes no
//! attempt at partial-frame recovery, so a failing pass aborts the run and the
//! application maps the error category to a process exit status.

use std::fmt;

use crate::graphics_device::ShaderStage;

/// Result type for Focus3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Focus3D engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Shader source failed to compile or link
    ShaderCompilation {
        stage: ShaderStage,
        message: String,
    },

    /// An underlying graphics API call reported an error (message names the call)
    GraphicsApi(String),

    /// A named shader program or texture could not be resolved
    ResourceResolution(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (bad attachment index, dangling texture, bad size, ...)
    InvalidResource(String),

    /// A uniform referenced by a shader program has no value in overrides or fallback
    MissingParameter {
        program: String,
        name: String,
    },

    /// A parameter value does not match the kind of the uniform it is bound to
    ParameterTypeMismatch {
        program: String,
        name: String,
        expected: String,
        found: String,
    },

    /// A pass ran while the size-dependent pipeline state was torn down
    NotInitialized,

    /// A pass ran out of the Shadow → Clear → Geometry → Compositing → Blur → DepthOfField order
    PassOutOfOrder {
        expected: String,
        found: String,
    },

    /// Initialization failed (device, context, subsystems)
    InitializationFailed(String),
}

impl Error {
    /// Process exit status for this error category
    ///
    /// Shader compilation failures exit with 3, graphics API failures with 2 and
    /// every other fatal error with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ShaderCompilation { .. } => 3,
            Error::GraphicsApi(_) | Error::OutOfMemory => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShaderCompilation { stage, message } => {
                write!(f, "Shader compilation error ({} shader): {}", stage, message)
            }
            Error::GraphicsApi(msg) => write!(f, "Graphics API error: {}", msg),
            Error::ResourceResolution(msg) => write!(f, "Resource resolution failed: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::MissingParameter { program, name } => write!(
                f,
                "Shader program '{}' references '{}' but no override or fallback value was given",
                program, name
            ),
            Error::ParameterTypeMismatch { program, name, expected, found } => write!(
                f,
                "Shader program '{}' expects {} for '{}', got {}",
                program, expected, name, found
            ),
            Error::NotInitialized => write!(f, "Renderer used before initialize() or after release()"),
            Error::PassOutOfOrder { expected, found } => {
                write!(f, "Pass out of order: expected {}, got {}", expected, found)
            }
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
