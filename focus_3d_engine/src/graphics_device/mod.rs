/// Graphics device module - the render context and the resource types it creates

pub mod graphics_device;
pub mod texture;
pub mod shader;
pub mod geometry;
pub mod frame_buffer;

pub use graphics_device::*;
pub use texture::*;
pub use shader::*;
pub use geometry::*;
pub use frame_buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
