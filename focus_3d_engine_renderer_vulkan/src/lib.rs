/*!
# Focus 3D Engine - Vulkan Backend

Headless Vulkan implementation of the focus_3d_engine `GraphicsDevice` trait.

The backend uses Ash for the Vulkan bindings, gpu-allocator for memory and
spirq to reflect the uniform interface of SPIR-V programs. It renders into an
offscreen default target that can be read back with
`VulkanGraphicsDevice::read_default_target`.

Validation layer support is compiled in only with the `vulkan-validation`
feature.

## Example

```no_run
use focus_3d_engine::focus3d::render::GraphicsDevice;
use focus_3d_engine_renderer_vulkan::focus3d::{Config, VulkanGraphicsDevice};

let mut device = VulkanGraphicsDevice::new(Config::default())?;
device.begin_frame()?;
device.end_frame()?;
let pixels = device.read_default_target()?;
# Ok::<(), focus_3d_engine::focus3d::Error>(())
```
*/

mod vulkan_config;
mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_frame_buffer;
mod vulkan_shader;
mod vulkan_geometry;
mod vulkan_sampler;
mod vulkan_pipeline;
mod vulkan_uniform_arena;
mod vulkan_graphics_device;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub mod focus3d {
    pub use crate::vulkan_config::{Config, DebugOutput, DebugSeverity};
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;

    // Validation counters (only with the `vulkan-validation` feature)
    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{validation_stats, ValidationStats};
}
