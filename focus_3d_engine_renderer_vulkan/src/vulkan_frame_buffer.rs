/// Framebuffer - Vulkan implementation of the engine NativeFramebuffer trait
///
/// Wraps a VkFramebuffer together with the render pass it was created for.
/// Attachments are loaded and stored on every pass instance, so drawing into
/// a framebuffer across several passes accumulates like a GL FBO.

use focus_3d_engine::focus3d::Result;
use focus_3d_engine::focus3d::render::{
    FramebufferDesc, InternalFormat, NativeFramebuffer, ResourceId, Texture as RendererTexture,
};
use focus_3d_engine::{engine_debug, engine_err};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{internal_format_to_vk, resting_layout};
use crate::vulkan_texture::Texture;

/// Vulkan framebuffer implementation
pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    name: String,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    color_formats: Vec<InternalFormat>,
    depth_format: Option<InternalFormat>,
    /// Attachments stay alive as long as the framebuffer
    color_attachments: Vec<Arc<dyn RendererTexture>>,
    depth_attachment: Option<Arc<dyn RendererTexture>>,
}

/// Render pass that loads and stores every attachment and leaves each one in
/// its resting layout
pub(crate) fn create_render_pass(
    device: &ash::Device,
    color_formats: &[InternalFormat],
    depth_format: Option<InternalFormat>,
) -> Result<vk::RenderPass> {
    let mut attachments = Vec::with_capacity(color_formats.len() + 1);
    let mut color_refs = Vec::with_capacity(color_formats.len());

    for (index, &format) in color_formats.iter().enumerate() {
        attachments.push(vk::AttachmentDescription::default()
            .format(internal_format_to_vk(format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::LOAD)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(resting_layout(format))
            .final_layout(resting_layout(format)));
        color_refs.push(vk::AttachmentReference::default()
            .attachment(index as u32)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
    }

    let depth_ref = depth_format.map(|format| {
        attachments.push(vk::AttachmentDescription::default()
            .format(internal_format_to_vk(format))
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::LOAD)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(resting_layout(format))
            .final_layout(resting_layout(format)));
        vk::AttachmentReference::default()
            .attachment(color_formats.len() as u32)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
    });

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    if let Some(depth_ref) = depth_ref.as_ref() {
        subpass = subpass.depth_stencil_attachment(depth_ref);
    }

    let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
        | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    let attachment_access = vk::AccessFlags::COLOR_ATTACHMENT_READ
        | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
        | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

    // Earlier samples, copies and attachment writes complete before this pass
    // writes, and this pass's writes are visible to later samples and copies
    let dependencies = [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages
                | vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::TRANSFER)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
                | vk::AccessFlags::TRANSFER_WRITE)
            .dst_stage_mask(attachment_stages)
            .dst_access_mask(attachment_access),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(attachment_stages)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
            .dst_stage_mask(attachment_stages
                | vk::PipelineStageFlags::FRAGMENT_SHADER
                | vk::PipelineStageFlags::TRANSFER)
            .dst_access_mask(attachment_access
                | vk::AccessFlags::SHADER_READ
                | vk::AccessFlags::TRANSFER_READ),
    ];

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe {
        device.create_render_pass(&render_pass_info, None)
            .map_err(|e| engine_err!("focus3d::vulkan", "Failed to create render pass: {:?}", e))
    }
}

impl Framebuffer {
    pub(crate) fn new(ctx: &Arc<GpuContext>, desc: &FramebufferDesc<'_>) -> Result<Self> {
        let mut views = Vec::with_capacity(desc.color_attachments.len() + 1);
        for texture in desc.color_attachments {
            views.push(Texture::from_dyn(texture.as_ref())?.view);
        }
        if let Some(depth) = desc.depth_attachment {
            views.push(Texture::from_dyn(depth.as_ref())?.view);
        }

        let color_formats: Vec<InternalFormat> = desc.color_attachments
            .iter()
            .map(|texture| texture.info().internal_format)
            .collect();
        let depth_format = desc.depth_attachment.map(|texture| texture.info().internal_format);

        let render_pass = create_render_pass(&ctx.device, &color_formats, depth_format)?;

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            match ctx.device.create_framebuffer(&framebuffer_info, None) {
                Ok(framebuffer) => framebuffer,
                Err(e) => {
                    ctx.device.destroy_render_pass(render_pass, None);
                    return Err(engine_err!("focus3d::vulkan",
                        "Failed to create framebuffer '{}': {:?}", desc.name, e));
                }
            }
        };

        engine_debug!("focus3d::vulkan", "Created framebuffer '{}' {}x{} ({} color, depth: {})",
            desc.name, desc.width, desc.height, color_formats.len(), depth_format.is_some());

        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ResourceId::next(),
            name: desc.name.to_string(),
            render_pass,
            framebuffer,
            width: desc.width,
            height: desc.height,
            color_formats,
            depth_format,
            color_attachments: desc.color_attachments.to_vec(),
            depth_attachment: desc.depth_attachment.cloned(),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn color_attachments(&self) -> &[Arc<dyn RendererTexture>] {
        &self.color_attachments
    }

    pub(crate) fn has_depth(&self) -> bool {
        self.depth_attachment.is_some()
    }

    /// Whether `id` is one of the attachments written by this framebuffer
    pub(crate) fn writes_to(&self, id: ResourceId) -> bool {
        self.color_attachments.iter().any(|texture| texture.id() == id)
            || self.depth_attachment.as_ref().is_some_and(|texture| texture.id() == id)
    }

    /// Downcast an engine framebuffer to the Vulkan one
    pub(crate) fn from_dyn(framebuffer: &dyn NativeFramebuffer) -> Result<&Framebuffer> {
        framebuffer.as_any().downcast_ref::<Framebuffer>().ok_or_else(|| {
            engine_err!("focus3d::vulkan",
                "Framebuffer {} was not created by the Vulkan device", framebuffer.id())
        })
    }
}

impl NativeFramebuffer for Framebuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn color_formats(&self) -> &[InternalFormat] {
        &self.color_formats
    }

    fn depth_format(&self) -> Option<InternalFormat> {
        self.depth_format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
