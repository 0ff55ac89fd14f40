/// Texture trait, format enums, texture descriptor and texture info

use std::any::Any;
use std::fmt;

use crate::graphics_device::ResourceId;

// ===== FORMATS =====

/// Channel layout of the pixels a pass writes or uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    Rg,
    Rgb,
    Rgba,
    Depth,
}

/// Data type of each channel as seen by the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    UnsignedByte,
    HalfFloat,
    Float,
}

/// Storage format of the GPU image
///
/// `Rgba8` is normalized storage: anything written is clamped to [0,1].
/// Passes that write signed or unbounded values (positions, normals, linear
/// depth) need one of the float formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    Rgba8,
    Rgba16F,
    Rgba32F,
    R32F,
    Depth32F,
}

impl InternalFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, InternalFormat::Depth32F)
    }

    /// Whether values outside [0,1] survive a write
    pub fn is_unclamped(self) -> bool {
        !matches!(self, InternalFormat::Rgba8)
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            InternalFormat::Rgba8 => 4,
            InternalFormat::Rgba16F => 8,
            InternalFormat::Rgba32F => 16,
            InternalFormat::R32F => 4,
            InternalFormat::Depth32F => 4,
        }
    }
}

impl fmt::Display for InternalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InternalFormat::Rgba8 => "RGBA8",
            InternalFormat::Rgba16F => "RGBA16F",
            InternalFormat::Rgba32F => "RGBA32F",
            InternalFormat::R32F => "R32F",
            InternalFormat::Depth32F => "DEPTH32F",
        };
        f.write_str(name)
    }
}

/// How the texture is used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUsage {
    /// Framebuffer color attachment, also sampled by later passes
    ColorAttachment,
    /// Framebuffer depth attachment
    DepthAttachment,
    /// Sampled only, contents uploaded at creation
    Sampled,
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub component_type: ComponentType,
    pub internal_format: InternalFormat,
    pub usage: TextureUsage,
    /// Initial pixels, tightly packed in `internal_format` (Sampled textures only)
    pub data: Option<Vec<u8>>,
}

impl TextureDesc {
    /// Check size and upload data against the format
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "texture '{}' has zero size {}x{}",
                self.name, self.width, self.height
            ));
        }
        if self.internal_format.is_depth() != (self.usage == TextureUsage::DepthAttachment) {
            return Err(format!(
                "texture '{}': format {} does not match usage {:?}",
                self.name, self.internal_format, self.usage
            ));
        }
        if let Some(data) = &self.data {
            let expected = self.width as usize
                * self.height as usize
                * self.internal_format.bytes_per_pixel() as usize;
            if data.len() != expected {
                return Err(format!(
                    "texture '{}': {} bytes of data, expected {}",
                    self.name,
                    data.len(),
                    expected
                ));
            }
        }
        Ok(())
    }
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub component_type: ComponentType,
    pub internal_format: InternalFormat,
    pub usage: TextureUsage,
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            pixel_format: desc.pixel_format,
            component_type: desc.component_type,
            internal_format: desc.internal_format,
            usage: desc.usage,
        }
    }
}

/// GPU texture, released when the last `Arc` goes away
pub trait Texture: Send + Sync {
    fn id(&self) -> ResourceId;

    fn info(&self) -> &TextureInfo;

    /// Downcast hook for backends
    fn as_any(&self) -> &dyn Any;
}
