/// NativeFramebuffer trait - the device-side render target behind a `Framebuffer`
///
/// Groups already-created color textures and an optional depth texture into
/// something the device can bind. Created once per size, never resized.

use std::any::Any;
use std::sync::Arc;

use crate::graphics_device::{ResourceId, Texture, InternalFormat};

/// Device render target built from attachment textures
pub trait NativeFramebuffer: Send + Sync {
    fn id(&self) -> ResourceId;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Formats of the color attachments, in attachment order
    fn color_formats(&self) -> &[InternalFormat];

    fn depth_format(&self) -> Option<InternalFormat>;

    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a native framebuffer
pub struct FramebufferDesc<'a> {
    pub name: &'a str,
    /// Color attachments in shader output order
    pub color_attachments: &'a [Arc<dyn Texture>],
    pub depth_attachment: Option<&'a Arc<dyn Texture>>,
    pub width: u32,
    pub height: u32,
}

impl FramebufferDesc<'_> {
    /// Check that every attachment matches the framebuffer size and role
    pub fn validate(&self) -> Result<(), String> {
        if self.color_attachments.is_empty() {
            return Err(format!("framebuffer '{}' has no color attachment", self.name));
        }
        for (index, texture) in self.color_attachments.iter().enumerate() {
            let info = texture.info();
            if info.internal_format.is_depth() {
                return Err(format!(
                    "framebuffer '{}': color attachment {} has depth format {}",
                    self.name, index, info.internal_format
                ));
            }
            if (info.width, info.height) != (self.width, self.height) {
                return Err(format!(
                    "framebuffer '{}': color attachment {} is {}x{}, expected {}x{}",
                    self.name, index, info.width, info.height, self.width, self.height
                ));
            }
        }
        if let Some(depth) = self.depth_attachment {
            let info = depth.info();
            if !info.internal_format.is_depth() {
                return Err(format!(
                    "framebuffer '{}': depth attachment has color format {}",
                    self.name, info.internal_format
                ));
            }
            if (info.width, info.height) != (self.width, self.height) {
                return Err(format!(
                    "framebuffer '{}': depth attachment is {}x{}, expected {}x{}",
                    self.name, info.width, info.height, self.width, self.height
                ));
            }
        }
        Ok(())
    }
}
