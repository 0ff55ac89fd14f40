/// Framebuffer: an offscreen render target with ordered color attachments and depth
///
/// All attachments are allocated eagerly at construction. There is no resize:
/// a new size means a new framebuffer, and dropping the old one frees its
/// textures (outstanding `TextureReference`s stop resolving).
///
/// Binding goes through `bind`, which hands back a `BoundFramebuffer` guard
/// holding the device exclusively. The guard is the only way to draw into the
/// framebuffer and it rebinds the default target when it goes away.

use std::sync::Arc;

use crate::error::Result;
use crate::{engine_bail, engine_bail_warn, engine_debug, engine_error};
use crate::framebuffer::AttachmentDescriptor;
use crate::graphics_device::{
    ComponentType, FramebufferDesc, GraphicsDevice, InternalFormat, NativeFramebuffer, PixelFormat,
    RenderTarget, Texture, TextureDesc, TextureUsage,
};
use crate::material::TextureReference;

pub struct Framebuffer {
    name: String,
    width: u32,
    height: u32,
    descriptors: Vec<AttachmentDescriptor>,
    color_attachments: Vec<Arc<dyn Texture>>,
    depth_attachment: Arc<dyn Texture>,
    native: Arc<dyn NativeFramebuffer>,
}

impl Framebuffer {
    /// Allocate every color attachment per descriptor plus a depth attachment
    ///
    /// # Errors
    ///
    /// `InvalidResource` for a zero size or an empty descriptor list, and any
    /// device error from texture or framebuffer creation.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        name: &str,
        width: u32,
        height: u32,
        descriptors: &[AttachmentDescriptor],
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            engine_bail_warn!("focus3d::Framebuffer",
                "Framebuffer '{}' requested with zero size {}x{}", name, width, height);
        }
        if descriptors.is_empty() {
            engine_bail_warn!("focus3d::Framebuffer",
                "Framebuffer '{}' requested without color attachments", name);
        }

        let color_attachments = descriptors
            .iter()
            .enumerate()
            .map(|(index, descriptor)| {
                device.create_texture(&descriptor.texture_desc(format!("{}.color{}", name, index), width, height))
            })
            .collect::<Result<Vec<_>>>()?;

        let depth_attachment = device.create_texture(&TextureDesc {
            name: format!("{}.depth", name),
            width,
            height,
            pixel_format: PixelFormat::Depth,
            component_type: ComponentType::Float,
            internal_format: InternalFormat::Depth32F,
            usage: TextureUsage::DepthAttachment,
            data: None,
        })?;

        let native = device.create_framebuffer(&FramebufferDesc {
            name,
            color_attachments: &color_attachments,
            depth_attachment: Some(&depth_attachment),
            width,
            height,
        })?;

        engine_debug!("focus3d::Framebuffer", "Framebuffer '{}' created: {}x{}, {} color attachment(s)",
            name, width, height, descriptors.len());

        Ok(Self {
            name: name.to_string(),
            width,
            height,
            descriptors: descriptors.to_vec(),
            color_attachments,
            depth_attachment,
            native,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Descriptors the attachments were created from, in attachment order
    pub fn attachment_descriptors(&self) -> &[AttachmentDescriptor] {
        &self.descriptors
    }

    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len()
    }

    pub fn native(&self) -> &Arc<dyn NativeFramebuffer> {
        &self.native
    }

    /// Weak reference to color attachment `index`, valid while this framebuffer lives
    ///
    /// # Errors
    ///
    /// `InvalidResource` when `index` is out of range.
    pub fn color_attachment(&self, index: usize) -> Result<TextureReference> {
        match self.color_attachments.get(index) {
            Some(texture) => Ok(TextureReference::new(format!("{}.color{}", self.name, index), texture)),
            None => engine_bail_warn!("focus3d::Framebuffer",
                "Framebuffer '{}' has no color attachment {} ({} attachments)",
                self.name, index, self.color_attachments.len()),
        }
    }

    pub fn depth_attachment(&self) -> TextureReference {
        TextureReference::new(format!("{}.depth", self.name), &self.depth_attachment)
    }

    /// Make this framebuffer the device's render target
    pub fn bind<'d>(&self, device: &'d mut dyn GraphicsDevice) -> Result<BoundFramebuffer<'d>> {
        device.bind_render_target(RenderTarget::Offscreen(&self.native))?;
        Ok(BoundFramebuffer {
            device,
            name: self.name.clone(),
            attachment_count: self.color_attachments.len() as u32,
            released: false,
        })
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

// ===== BIND GUARD =====

/// A framebuffer bound on the device
///
/// While the guard lives nothing else can touch the device, so at most one
/// framebuffer is ever bound. Dropping the guard rebinds the default target;
/// `unbind` does the same but reports failure.
pub struct BoundFramebuffer<'d> {
    device: &'d mut dyn GraphicsDevice,
    name: String,
    attachment_count: u32,
    released: bool,
}

impl BoundFramebuffer<'_> {
    /// Route fragment outputs to every color attachment, in order
    pub fn set_draw_buffers(&mut self) -> Result<()> {
        self.device.set_draw_buffers(self.attachment_count)
    }

    /// The device, for clears and draws into this framebuffer
    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        &mut *self.device
    }

    /// Restore the default target
    pub fn unbind(mut self) -> Result<()> {
        self.released = true;
        if let Err(error) = self.device.bind_render_target(RenderTarget::Default) {
            engine_bail!("focus3d::Framebuffer", error = error);
        }
        Ok(())
    }
}

impl Drop for BoundFramebuffer<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = self.device.bind_render_target(RenderTarget::Default) {
            engine_error!("focus3d::Framebuffer",
                "Failed to unbind framebuffer '{}': {}", self.name, error);
        }
    }
}

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;
