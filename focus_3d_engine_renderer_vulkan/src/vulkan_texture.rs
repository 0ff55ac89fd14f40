/// Texture - Vulkan implementation of the engine Texture trait
///
/// Every texture is a single-mip 2D image. Between commands a color texture
/// rests in SHADER_READ_ONLY_OPTIMAL and a depth texture in
/// DEPTH_STENCIL_ATTACHMENT_OPTIMAL; render passes and copies transition away
/// from and back to the resting layout.

use focus_3d_engine::focus3d::Result;
use focus_3d_engine::focus3d::render::{
    InternalFormat, ResourceId, Texture as RendererTexture, TextureDesc, TextureInfo, TextureUsage,
};
use focus_3d_engine::{engine_bail, engine_err, engine_trace};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_mask, internal_format_to_vk, resting_layout};

/// Vulkan texture implementation
pub struct Texture {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    name: String,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    info: TextureInfo,
}

fn usage_flags(usage: TextureUsage) -> vk::ImageUsageFlags {
    match usage {
        TextureUsage::ColorAttachment => {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
        }
        TextureUsage::DepthAttachment => {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST
        }
        TextureUsage::Sampled => {
            vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC
        }
    }
}

/// Pipeline stages and accesses that touch an image in `layout`
fn layout_sync(layout: vk::ImageLayout) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    match layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => {
            (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_WRITE)
        }
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => {
            (vk::PipelineStageFlags::TRANSFER, vk::AccessFlags::TRANSFER_READ)
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        ),
        _ => (vk::PipelineStageFlags::TOP_OF_PIPE, vk::AccessFlags::empty()),
    }
}

/// Record an image layout transition with stages and accesses derived from
/// the two layouts
pub(crate) fn record_layout_transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    aspect: vk::ImageAspectFlags,
    from: vk::ImageLayout,
    to: vk::ImageLayout,
) {
    let (src_stage, src_access) = layout_sync(from);
    let (dst_stage, dst_access) = layout_sync(to);

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(from)
        .new_layout(to)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(full_range(aspect))
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

pub(crate) fn full_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

pub(crate) fn full_layers(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl Texture {
    /// Create the image, its view, and bring it to its resting layout
    ///
    /// Uploaded pixels come from `desc.data`; without data color images are
    /// cleared to zero and depth images to 1.0.
    pub(crate) fn new(ctx: &Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        let format = internal_format_to_vk(desc.internal_format);
        let aspect = aspect_mask(desc.internal_format);

        let texture = unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_flags(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("focus3d::vulkan", "Failed to create image '{}': {:?}", desc.name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate(&desc.name, requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                engine_bail!("focus3d::vulkan", "Failed to bind memory of image '{}': {:?}", desc.name, e);
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(full_range(aspect));

            let view = match ctx.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.free(allocation);
                    ctx.device.destroy_image(image, None);
                    engine_bail!("focus3d::vulkan", "Failed to create view of image '{}': {:?}", desc.name, e);
                }
            };

            // From here on Drop cleans up
            Self {
                ctx: Arc::clone(ctx),
                id: ResourceId::next(),
                name: desc.name.clone(),
                image,
                view,
                allocation: Some(allocation),
                info: TextureInfo::from(desc),
            }
        };

        texture.initialize_contents(desc.data.as_deref())?;

        engine_trace!("focus3d::vulkan", "Created texture '{}' {}x{} {}",
            desc.name, desc.width, desc.height, desc.internal_format);

        Ok(texture)
    }

    fn initialize_contents(&self, data: Option<&[u8]>) -> Result<()> {
        let format = self.info.internal_format;
        let aspect = aspect_mask(format);
        let extent = vk::Extent3D {
            width: self.info.width,
            height: self.info.height,
            depth: 1,
        };

        let staging = match data {
            Some(bytes) => Some(Buffer::with_data(
                &self.ctx,
                &format!("{}.staging", self.name),
                bytes,
                vk::BufferUsageFlags::TRANSFER_SRC,
            )?),
            None => None,
        };

        let image = self.image;
        self.ctx.run_one_shot("texture upload", |device, command_buffer| unsafe {
            record_layout_transition(device, command_buffer, image, aspect,
                vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

            match &staging {
                Some(buffer) => {
                    let region = vk::BufferImageCopy {
                        buffer_offset: 0,
                        buffer_row_length: 0,
                        buffer_image_height: 0,
                        image_subresource: full_layers(aspect),
                        image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                        image_extent: extent,
                    };
                    device.cmd_copy_buffer_to_image(
                        command_buffer,
                        buffer.handle(),
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &[region],
                    );
                }
                None if format.is_depth() => {
                    device.cmd_clear_depth_stencil_image(
                        command_buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                        &[full_range(aspect)],
                    );
                }
                None => {
                    device.cmd_clear_color_image(
                        command_buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &vk::ClearColorValue { float32: [0.0; 4] },
                        &[full_range(aspect)],
                    );
                }
            }

            record_layout_transition(device, command_buffer, image, aspect,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL, resting_layout(format));
        })
    }

    pub(crate) fn format(&self) -> InternalFormat {
        self.info.internal_format
    }

    /// Downcast an engine texture to the Vulkan one
    pub(crate) fn from_dyn(texture: &dyn RendererTexture) -> Result<&Texture> {
        texture.as_any().downcast_ref::<Texture>().ok_or_else(|| {
            engine_err!("focus3d::vulkan", "Texture {} was not created by the Vulkan device", texture.id())
        })
    }
}

impl RendererTexture for Texture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
