/// Conversions between engine formats and Vulkan formats, plus std140 packing
/// of uniform values

use ash::vk;
use focus_3d_engine::focus3d::render::{
    InternalFormat, PrimitiveTopology, UniformKind, UniformValue, VertexFormat,
};

pub(crate) fn internal_format_to_vk(format: InternalFormat) -> vk::Format {
    match format {
        InternalFormat::Rgba8 => vk::Format::R8G8B8A8_UNORM,
        InternalFormat::Rgba16F => vk::Format::R16G16B16A16_SFLOAT,
        InternalFormat::Rgba32F => vk::Format::R32G32B32A32_SFLOAT,
        InternalFormat::R32F => vk::Format::R32_SFLOAT,
        InternalFormat::Depth32F => vk::Format::D32_SFLOAT,
    }
}

pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Float32 => vk::Format::R32_SFLOAT,
        VertexFormat::Float32x2 => vk::Format::R32G32_SFLOAT,
        VertexFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::Float32x4 => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

pub(crate) fn aspect_mask(format: InternalFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Layout a texture rests in between commands
pub(crate) fn resting_layout(format: InternalFormat) -> vk::ImageLayout {
    if format.is_depth() {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    } else {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    }
}

/// 32-bit float formats are not guaranteed to be filterable
pub(crate) fn sampler_filter(format: InternalFormat) -> vk::Filter {
    match format {
        InternalFormat::Rgba32F | InternalFormat::R32F | InternalFormat::Depth32F => {
            vk::Filter::NEAREST
        }
        InternalFormat::Rgba8 | InternalFormat::Rgba16F => vk::Filter::LINEAR,
    }
}

/// Size of a uniform block member under std140 rules
pub(crate) fn std140_size(kind: UniformKind) -> usize {
    match kind {
        UniformKind::Float | UniformKind::Bool => 4,
        UniformKind::Vec2 => 8,
        UniformKind::Vec3 => 12,
        UniformKind::Vec4 => 16,
        // three vec4-aligned columns
        UniformKind::Mat3 => 48,
        UniformKind::Mat4 => 64,
        UniformKind::Sampler2D => 0,
    }
}

/// Bytes of a value as laid out in a std140 uniform block
///
/// Samplers have no block representation and yield an empty vector.
pub(crate) fn std140_bytes(value: &UniformValue<'_>) -> Vec<u8> {
    match value {
        UniformValue::Float(v) => v.to_ne_bytes().to_vec(),
        UniformValue::Bool(v) => u32::from(*v).to_ne_bytes().to_vec(),
        UniformValue::Vec2(v) => bytemuck::cast_slice::<f32, u8>(&v.to_array()).to_vec(),
        UniformValue::Vec3(v) => bytemuck::cast_slice::<f32, u8>(&v.to_array()).to_vec(),
        UniformValue::Vec4(v) => bytemuck::cast_slice::<f32, u8>(&v.to_array()).to_vec(),
        UniformValue::Mat3(m) => {
            let mut bytes = Vec::with_capacity(48);
            for column in [m.x_axis, m.y_axis, m.z_axis] {
                bytes.extend_from_slice(bytemuck::cast_slice::<f32, u8>(&column.extend(0.0).to_array()));
            }
            bytes
        }
        UniformValue::Mat4(m) => bytemuck::cast_slice::<f32, u8>(&m.to_cols_array()).to_vec(),
        UniformValue::Texture { .. } => Vec::new(),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
