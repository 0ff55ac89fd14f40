/*!
# Focus 3D Engine

Core traits and types for the Focus3D deferred depth-of-field renderer.

The crate is backend-agnostic: every GPU call goes through the
`GraphicsDevice` trait, and backend implementations (Vulkan today) provide
the concrete resources behind it.

## Architecture

- **GraphicsDevice**: render context trait (resource creation, state, draws)
- **Framebuffer**: sized set of color attachments plus depth, bound through a guard
- **MaterialFactory**: named shader programs and textures
- **MaterialParameterValues**: uniform values resolved against a program's interface
- **Renderer**: the six-pass frame (shadow, clear, geometry, compositing, blur, depth of field)
- **Camera / SpotLight**: the two viewpoints a frame is rendered from
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod material;
pub mod framebuffer;
pub mod camera;
pub mod scene;
pub mod pipeline;

// Main focus3d namespace module
pub mod focus3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logging hub)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module: device abstraction, framebuffers and the pass pipeline
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::framebuffer::*;
        pub use crate::pipeline::*;
    }

    // Material sub-module
    pub mod material {
        pub use crate::material::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }
}

// Re-export math library at crate root
pub use glam;
