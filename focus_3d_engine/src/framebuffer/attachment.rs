/// Attachment descriptors: the format triple of one framebuffer color attachment

use crate::graphics_device::{ComponentType, InternalFormat, PixelFormat, TextureDesc, TextureUsage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDescriptor {
    pub pixel_format: PixelFormat,
    pub component_type: ComponentType,
    pub internal_format: InternalFormat,
}

impl AttachmentDescriptor {
    pub const fn new(
        pixel_format: PixelFormat,
        component_type: ComponentType,
        internal_format: InternalFormat,
    ) -> Self {
        Self {
            pixel_format,
            component_type,
            internal_format,
        }
    }

    /// Texture descriptor for one attachment of a `width` x `height` framebuffer
    pub fn texture_desc(&self, name: impl Into<String>, width: u32, height: u32) -> TextureDesc {
        TextureDesc {
            name: name.into(),
            width,
            height,
            pixel_format: self.pixel_format,
            component_type: self.component_type,
            internal_format: self.internal_format,
            usage: TextureUsage::ColorAttachment,
            data: None,
        }
    }
}

/// Geometry buffer layout: diffuse, normal, position, linear depth
///
/// Diffuse is normalized RGBA8. Normals, world-space positions and linear depth
/// are signed or unbounded, so they get RGBA32F.
pub fn color_normal_position_attachments() -> Vec<AttachmentDescriptor> {
    vec![
        AttachmentDescriptor::new(PixelFormat::Rgba, ComponentType::Float, InternalFormat::Rgba8),
        AttachmentDescriptor::new(PixelFormat::Rgba, ComponentType::Float, InternalFormat::Rgba32F),
        AttachmentDescriptor::new(PixelFormat::Rgba, ComponentType::Float, InternalFormat::Rgba32F),
        AttachmentDescriptor::new(PixelFormat::Rgba, ComponentType::Float, InternalFormat::Rgba32F),
    ]
}

/// One RGBA32F color attachment (scene color, blur, shadow map)
pub fn single_color_attachment() -> Vec<AttachmentDescriptor> {
    vec![AttachmentDescriptor::new(PixelFormat::Rgba, ComponentType::Float, InternalFormat::Rgba32F)]
}
