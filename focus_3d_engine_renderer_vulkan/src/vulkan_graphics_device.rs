/// VulkanGraphicsDevice - headless Vulkan implementation of GraphicsDevice
///
/// The device emulates an immediate-mode GL context on top of Vulkan:
/// - state calls (target, viewport, depth test, program, uniforms) only
///   update CPU-side state
/// - clears and draws are recorded into one command buffer per frame, render
///   passes are opened lazily and closed when the target changes
/// - `end_frame` submits and waits, so a finished frame is fully on the GPU
///
/// There is no window and no swapchain. The default target is an offscreen
/// RGBA8 + depth framebuffer that `read_default_target` copies back to the CPU.
/// Rows are stored bottom-up: row 0 is NDC y = -1, as in GL.

use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::focus3d::render::{
    ActiveUniform, BoundTarget, ClearFlags, ComponentType, FramebufferDesc,
    Geometry as RendererGeometry, GeometryDesc, GraphicsDevice, InternalFormat, NativeFramebuffer,
    NativeProgram, PixelFormat, RenderTarget, ShaderProgramDesc, Texture as RendererTexture,
    TextureDesc, TextureUsage, UniformValue, Viewport,
};
use focus_3d_engine::{
    engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_trace, engine_warn,
    engine_warn_err,
};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_config::Config;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{sampler_filter, std140_bytes};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_geometry::Geometry;
use crate::vulkan_pipeline::{PipelineCache, PipelineKey};
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::{Program, SlotLocation, UniformSlot};
use crate::vulkan_texture::{full_layers, record_layout_transition, Texture};
use crate::vulkan_uniform_arena::UniformArena;

/// Descriptor sets one frame may allocate (one per draw)
const MAX_DRAWS_PER_FRAME: u32 = 1024;

/// Sampler descriptors reserved per draw
const MAX_SAMPLERS_PER_DRAW: u32 = 8;

/// Resources referenced by commands recorded in the current frame
///
/// Dropping them before the frame is submitted would destroy handles the
/// command buffer still uses.
#[derive(Default)]
struct FrameResources {
    textures: Vec<Arc<dyn RendererTexture>>,
    framebuffers: Vec<Arc<dyn NativeFramebuffer>>,
    programs: Vec<Arc<dyn NativeProgram>>,
    geometries: Vec<Arc<dyn RendererGeometry>>,
}

impl FrameResources {
    fn clear(&mut self) {
        self.textures.clear();
        self.framebuffers.clear();
        self.programs.clear();
        self.geometries.clear();
    }
}

/// How the current command buffer was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recording {
    Idle,
    /// Between `begin_frame` and `end_frame`
    Frame,
    /// Started by a command issued outside a frame
    Implicit,
}

/// Headless Vulkan graphics device
pub struct VulkanGraphicsDevice {
    // ===== FRAME RECORDING =====
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    frame_fence: vk::Fence,
    descriptor_pool: vk::DescriptorPool,
    recording: Recording,
    render_pass_open: bool,
    frame_resources: FrameResources,
    frames_submitted: u64,

    uniform_arena: UniformArena,
    sampler_cache: SamplerCache,
    pipeline_cache: PipelineCache,
    /// Copies of bound attachments a draw also samples, by (width, height, format)
    snapshots: FxHashMap<(u32, u32, InternalFormat), Arc<Texture>>,

    // ===== GL-STYLE STATE =====
    default_target: Arc<dyn NativeFramebuffer>,
    bound_target: Arc<dyn NativeFramebuffer>,
    bound_is_default: bool,
    draw_buffers: u32,
    viewport: Viewport,
    depth_test: bool,
    clear_color: [f32; 4],

    program: Option<Arc<dyn NativeProgram>>,
    /// std140 image of the active program's uniform block
    uniform_data: Vec<u8>,
    /// Per program slot: whether a value was set since `use_program`
    uniform_set: Vec<bool>,
    /// Per program slot: texture bound to a sampler
    sampler_textures: Vec<Option<Arc<dyn RendererTexture>>>,

    ctx: Arc<GpuContext>,
}

fn init_error(message: String) -> Error {
    engine_error!("focus3d::vulkan", "{}", message);
    Error::InitializationFailed(message)
}

fn create_default_target(ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<Arc<dyn NativeFramebuffer>> {
    let color: Arc<dyn RendererTexture> = Arc::new(Texture::new(ctx, &TextureDesc {
        name: "default.color".to_string(),
        width,
        height,
        pixel_format: PixelFormat::Rgba,
        component_type: ComponentType::UnsignedByte,
        internal_format: InternalFormat::Rgba8,
        usage: TextureUsage::ColorAttachment,
        data: None,
    })?);
    let depth: Arc<dyn RendererTexture> = Arc::new(Texture::new(ctx, &TextureDesc {
        name: "default.depth".to_string(),
        width,
        height,
        pixel_format: PixelFormat::Depth,
        component_type: ComponentType::Float,
        internal_format: InternalFormat::Depth32F,
        usage: TextureUsage::DepthAttachment,
        data: None,
    })?);

    let framebuffer = Framebuffer::new(ctx, &FramebufferDesc {
        name: "default",
        color_attachments: std::slice::from_ref(&color),
        depth_attachment: Some(&depth),
        width,
        height,
    })?;
    Ok(Arc::new(framebuffer))
}

impl VulkanGraphicsDevice {
    /// Create the instance, pick the first GPU with a graphics queue and set
    /// up the offscreen default target
    pub fn new(config: Config) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(init_error(format!(
                "default target size {}x{} is empty", config.width, config.height
            )));
        }

        let (ctx, properties) = Self::create_context(&config)?;
        let ctx = Arc::new(ctx);

        let device_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        engine_info!("focus3d::vulkan", "Using GPU '{}' (headless, {}x{})",
            device_name, config.width, config.height);

        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);
            let command_pool = ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| init_error(format!("Failed to create frame command pool: {:?}", e)))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = ctx.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| init_error(format!("Failed to allocate frame command buffer: {:?}", e)))?[0];

            let frame_fence = ctx.device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| init_error(format!("Failed to create frame fence: {:?}", e)))?;

            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: MAX_DRAWS_PER_FRAME,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: MAX_DRAWS_PER_FRAME * MAX_SAMPLERS_PER_DRAW,
                },
            ];
            let descriptor_pool_info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(MAX_DRAWS_PER_FRAME)
                .pool_sizes(&pool_sizes);
            let descriptor_pool = ctx.device.create_descriptor_pool(&descriptor_pool_info, None)
                .map_err(|e| init_error(format!("Failed to create descriptor pool: {:?}", e)))?;

            let uniform_arena = UniformArena::new(
                &ctx,
                config.uniform_arena_size,
                properties.limits.min_uniform_buffer_offset_alignment,
            )?;

            let default_target = create_default_target(&ctx, config.width, config.height)?;

            Ok(Self {
                command_pool,
                command_buffer,
                frame_fence,
                descriptor_pool,
                recording: Recording::Idle,
                render_pass_open: false,
                frame_resources: FrameResources::default(),
                frames_submitted: 0,
                uniform_arena,
                sampler_cache: SamplerCache::new(Arc::clone(&ctx)),
                pipeline_cache: PipelineCache::new(Arc::clone(&ctx)),
                snapshots: FxHashMap::default(),
                bound_target: Arc::clone(&default_target),
                default_target,
                bound_is_default: true,
                draw_buffers: 1,
                viewport: Viewport::full(config.width, config.height),
                depth_test: false,
                clear_color: [0.0, 0.0, 0.0, 0.0],
                program: None,
                uniform_data: Vec::new(),
                uniform_set: Vec::new(),
                sampler_textures: Vec::new(),
                ctx,
            })
        }
    }

    fn create_context(config: &Config) -> Result<(GpuContext, vk::PhysicalDeviceProperties)> {
        #[cfg(feature = "vulkan-validation")]
        let enable_validation = config.enable_validation;
        #[cfg(not(feature = "vulkan-validation"))]
        let enable_validation = {
            if config.enable_validation {
                engine_warn!("focus3d::vulkan",
                    "Validation requested but the crate was built without the `vulkan-validation` feature");
            }
            false
        };

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error(format!("Failed to load Vulkan library: {:?}", e)))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| init_error(format!("Invalid application name '{}'", config.app_name)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Focus3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None)
                .map_err(|e| init_error(format!("Failed to create Vulkan instance: {:?}", e)))?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config(crate::debug::Config {
                    severity: config.debug_severity,
                    output: config.debug_output.clone(),
                    break_on_error: config.break_on_validation_error,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils.create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_error(format!("Failed to create debug messenger: {:?}", e)))?;

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let (debug_utils_loader, debug_messenger) = (None, None);

            let physical_devices = instance.enumerate_physical_devices()
                .map_err(|e| init_error(format!("Failed to enumerate physical devices: {:?}", e)))?;

            let (physical_device, graphics_queue_family) = physical_devices
                .iter()
                .find_map(|&physical_device| {
                    instance
                        .get_physical_device_queue_family_properties(physical_device)
                        .iter()
                        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                        .map(|index| (physical_device, index as u32))
                })
                .ok_or_else(|| init_error("No Vulkan GPU with a graphics queue found".to_string()))?;

            let properties = instance.get_physical_device_properties(physical_device);

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_features(&device_features);

            let device = instance.create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error(format!("Failed to create logical device: {:?}", e)))?;
            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error(format!("Failed to create GPU allocator: {:?}", e)))?;

            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(graphics_queue_family);
            let upload_command_pool = device.create_command_pool(&upload_pool_info, None)
                .map_err(|e| init_error(format!("Failed to create upload command pool: {:?}", e)))?;

            let ctx = GpuContext::new(
                entry,
                instance,
                device,
                allocator,
                graphics_queue,
                graphics_queue_family,
                upload_command_pool,
                debug_utils_loader,
                debug_messenger,
            );
            Ok((ctx, properties))
        }
    }

    /// Number of frames submitted so far
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Copy the default target's color attachment back to the CPU
    ///
    /// Pending work is submitted first. Returns tightly packed RGBA8 rows,
    /// bottom row first.
    pub fn read_default_target(&mut self) -> Result<Vec<u8>> {
        self.wait_idle()?;

        let framebuffer = Framebuffer::from_dyn(self.default_target.as_ref())?;
        let color = framebuffer.color_attachments()
            .first()
            .ok_or_else(|| engine_err!("focus3d::vulkan", "Default target has no color attachment"))?;
        let texture = Texture::from_dyn(color.as_ref())?;
        let extent = framebuffer.extent();
        let size = extent.width as usize * extent.height as usize * 4;

        let staging = Buffer::new(
            &self.ctx,
            "default_target.readback",
            size as u64,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
        )?;

        let image = texture.image;
        let aspect = vk::ImageAspectFlags::COLOR;
        self.ctx.run_one_shot("read_default_target", |device, command_buffer| unsafe {
            record_layout_transition(device, command_buffer, image, aspect,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);

            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: full_layers(aspect),
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                },
            };
            device.cmd_copy_image_to_buffer(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                staging.handle(),
                &[region],
            );

            record_layout_transition(device, command_buffer, image, aspect,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        })?;

        staging.read(size)
    }

    /// Replace the default target with one of the new size
    pub fn resize_default_target(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(engine_warn_err!("focus3d::vulkan",
                "Cannot resize the default target to {}x{}", width, height));
        }
        self.wait_idle()?;
        self.default_target = create_default_target(&self.ctx, width, height)?;
        if self.bound_is_default {
            self.bound_target = Arc::clone(&self.default_target);
        }
        engine_debug!("focus3d::vulkan", "Default target resized to {}x{}", width, height);
        Ok(())
    }

    // ===== RECORDING =====

    fn start_recording(&mut self, mode: Recording) -> Result<()> {
        unsafe {
            self.ctx.device.reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| engine_err!("focus3d::vulkan", "vkResetCommandPool failed: {:?}", e))?;
            self.ctx.device.reset_descriptor_pool(self.descriptor_pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| engine_err!("focus3d::vulkan", "vkResetDescriptorPool failed: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("focus3d::vulkan", "vkBeginCommandBuffer failed: {:?}", e))?;
        }
        self.uniform_arena.reset();
        self.frame_resources.clear();
        self.render_pass_open = false;
        self.recording = mode;
        Ok(())
    }

    fn ensure_recording(&mut self) -> Result<()> {
        if self.recording == Recording::Idle {
            self.start_recording(Recording::Implicit)?;
        }
        Ok(())
    }

    fn end_render_pass(&mut self) {
        if self.render_pass_open {
            unsafe { self.ctx.device.cmd_end_render_pass(self.command_buffer) };
            self.render_pass_open = false;
        }
    }

    fn ensure_render_pass(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.render_pass_open {
            return Ok(());
        }

        let framebuffer = Framebuffer::from_dyn(self.bound_target.as_ref())?;
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(framebuffer.render_pass)
            .framebuffer(framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: framebuffer.extent(),
            });
        unsafe {
            self.ctx.device.cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        self.render_pass_open = true;
        self.frame_resources.framebuffers.push(Arc::clone(&self.bound_target));
        Ok(())
    }

    /// Close the command buffer, submit it and wait for the GPU
    fn submit(&mut self) -> Result<()> {
        self.end_render_pass();

        let result = unsafe {
            let device = &self.ctx.device;
            device.end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("focus3d::vulkan", "vkEndCommandBuffer failed: {:?}", e))
                .and_then(|_| {
                    let command_buffers = [self.command_buffer];
                    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                    device.queue_submit(self.ctx.graphics_queue, &[submit_info], self.frame_fence)
                        .map_err(|e| engine_err!("focus3d::vulkan", "vkQueueSubmit failed: {:?}", e))
                })
                .and_then(|_| {
                    device.wait_for_fences(&[self.frame_fence], true, u64::MAX)
                        .map_err(|e| engine_err!("focus3d::vulkan", "vkWaitForFences failed: {:?}", e))
                })
                .and_then(|_| {
                    device.reset_fences(&[self.frame_fence])
                        .map_err(|e| engine_err!("focus3d::vulkan", "vkResetFences failed: {:?}", e))
                })
        };

        self.recording = Recording::Idle;
        self.frame_resources.clear();
        result?;
        self.frames_submitted += 1;
        Ok(())
    }

    // ===== DRAW HELPERS =====

    /// Copy a bound attachment into a snapshot texture so a draw can sample it
    fn snapshot(&mut self, source: &Arc<dyn RendererTexture>) -> Result<Arc<dyn RendererTexture>> {
        let info = source.info().clone();
        if info.internal_format.is_depth() {
            engine_bail!("focus3d::vulkan", "Depth texture {} cannot be sampled", source.id());
        }

        let key = (info.width, info.height, info.internal_format);
        let snapshot = match self.snapshots.get(&key) {
            Some(texture) => Arc::clone(texture),
            None => {
                let texture = Arc::new(Texture::new(&self.ctx, &TextureDesc {
                    name: format!("snapshot.{}x{}.{}", info.width, info.height, info.internal_format),
                    width: info.width,
                    height: info.height,
                    pixel_format: info.pixel_format,
                    component_type: info.component_type,
                    internal_format: info.internal_format,
                    usage: TextureUsage::Sampled,
                    data: None,
                })?);
                self.snapshots.insert(key, Arc::clone(&texture));
                texture
            }
        };

        self.end_render_pass();

        let src_image = Texture::from_dyn(source.as_ref())?.image;
        let dst_image = snapshot.image;
        let aspect = vk::ImageAspectFlags::COLOR;
        let device = &self.ctx.device;
        let command_buffer = self.command_buffer;

        record_layout_transition(device, command_buffer, src_image, aspect,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        record_layout_transition(device, command_buffer, dst_image, aspect,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

        let region = vk::ImageCopy {
            src_subresource: full_layers(aspect),
            src_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            dst_subresource: full_layers(aspect),
            dst_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            extent: vk::Extent3D {
                width: info.width,
                height: info.height,
                depth: 1,
            },
        };
        unsafe {
            device.cmd_copy_image(
                command_buffer,
                src_image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        record_layout_transition(device, command_buffer, src_image, aspect,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        record_layout_transition(device, command_buffer, dst_image, aspect,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        engine_trace!("focus3d::vulkan", "Snapshot of bound attachment {} for sampling", source.id());

        let snapshot: Arc<dyn RendererTexture> = snapshot;
        self.frame_resources.textures.push(Arc::clone(source));
        Ok(snapshot)
    }

    /// Allocate and fill the descriptor set of one draw
    fn write_descriptor_set(
        &mut self,
        program: &Program,
        samplers: &[(u32, Arc<dyn RendererTexture>)],
    ) -> Result<vk::DescriptorSet> {
        let layouts = [program.set_layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);
        let descriptor_set = unsafe {
            self.ctx.device.allocate_descriptor_sets(&allocate_info)
                .map_err(|e| engine_err!("focus3d::vulkan",
                    "Descriptor pool exhausted (more than {} draws in one frame?): {:?}",
                    MAX_DRAWS_PER_FRAME, e))?[0]
        };

        let buffer_info = match program.block() {
            Some(block) => {
                let offset = self.uniform_arena.push(&self.uniform_data)?;
                Some((block.binding, vk::DescriptorBufferInfo {
                    buffer: self.uniform_arena.handle(),
                    offset,
                    range: block.size as u64,
                }))
            }
            None => None,
        };

        let mut image_infos = Vec::with_capacity(samplers.len());
        for (binding, texture) in samplers {
            let sampler = self.sampler_cache.get(sampler_filter(texture.info().internal_format))?;
            image_infos.push((*binding, vk::DescriptorImageInfo {
                sampler,
                image_view: Texture::from_dyn(texture.as_ref())?.view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }));
        }

        let mut writes = Vec::with_capacity(image_infos.len() + 1);
        if let Some((binding, info)) = &buffer_info {
            writes.push(vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(std::slice::from_ref(info)));
        }
        for (binding, info) in &image_infos {
            writes.push(vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(std::slice::from_ref(info)));
        }

        unsafe { self.ctx.device.update_descriptor_sets(&writes, &[]) };
        Ok(descriptor_set)
    }

    fn slot_of<'a>(&self, program: &'a Program, uniform: &ActiveUniform) -> Result<(usize, &'a UniformSlot)> {
        let index = program.slot_index(&uniform.name).ok_or_else(|| {
            engine_err!("focus3d::vulkan", "Program '{}' has no active uniform '{}'",
                program.name(), uniform.name)
        })?;
        Ok((index, &program.slots()[index]))
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        desc.validate().map_err(|message| engine_warn_err!("focus3d::vulkan", "{}", message))?;
        Ok(Arc::new(Texture::new(&self.ctx, desc)?))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn NativeFramebuffer>> {
        desc.validate().map_err(|message| engine_warn_err!("focus3d::vulkan", "{}", message))?;
        Ok(Arc::new(Framebuffer::new(&self.ctx, desc)?))
    }

    fn create_program(&mut self, desc: &ShaderProgramDesc) -> Result<Arc<dyn NativeProgram>> {
        Ok(Arc::new(Program::new(&self.ctx, desc)?))
    }

    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<Arc<dyn RendererGeometry>> {
        Ok(Arc::new(Geometry::new(&self.ctx, desc)?))
    }

    fn bind_render_target(&mut self, target: RenderTarget<'_>) -> Result<()> {
        let (framebuffer, is_default) = match target {
            RenderTarget::Default => (Arc::clone(&self.default_target), true),
            RenderTarget::Offscreen(framebuffer) => {
                Framebuffer::from_dyn(framebuffer.as_ref())?;
                (Arc::clone(framebuffer), false)
            }
        };

        if !Arc::ptr_eq(&framebuffer, &self.bound_target) {
            self.end_render_pass();
        }
        self.bound_target = framebuffer;
        self.bound_is_default = is_default;
        self.draw_buffers = 1;
        Ok(())
    }

    fn bound_target(&self) -> BoundTarget {
        if self.bound_is_default {
            BoundTarget::Default
        } else {
            BoundTarget::Offscreen(self.bound_target.id())
        }
    }

    fn set_draw_buffers(&mut self, count: u32) -> Result<()> {
        let available = self.bound_target.color_formats().len() as u32;
        if count == 0 || count > available {
            engine_bail!("focus3d::vulkan",
                "glDrawBuffers: {} draw buffers requested, bound target has {} color attachments",
                count, available);
        }
        self.draw_buffers = count;
        Ok(())
    }

    fn default_target_size(&self) -> (u32, u32) {
        (self.default_target.width(), self.default_target.height())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn clear(&mut self, flags: ClearFlags) -> Result<()> {
        if flags.is_empty() {
            return Ok(());
        }
        self.ensure_render_pass()?;

        let framebuffer = Framebuffer::from_dyn(self.bound_target.as_ref())?;
        let mut attachments = Vec::with_capacity(framebuffer.color_formats().len() + 1);
        if flags.contains(ClearFlags::COLOR) {
            for index in 0..framebuffer.color_formats().len() as u32 {
                attachments.push(vk::ClearAttachment {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    color_attachment: index,
                    clear_value: vk::ClearValue {
                        color: vk::ClearColorValue { float32: self.clear_color },
                    },
                });
            }
        }
        if flags.contains(ClearFlags::DEPTH) && framebuffer.has_depth() {
            attachments.push(vk::ClearAttachment {
                aspect_mask: vk::ImageAspectFlags::DEPTH,
                color_attachment: 0,
                clear_value: vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                },
            });
        }
        if attachments.is_empty() {
            return Ok(());
        }

        let rect = vk::ClearRect {
            rect: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: framebuffer.extent(),
            },
            base_array_layer: 0,
            layer_count: 1,
        };
        unsafe {
            self.ctx.device.cmd_clear_attachments(self.command_buffer, &attachments, &[rect]);
        }
        Ok(())
    }

    fn use_program(&mut self, program: &Arc<dyn NativeProgram>) -> Result<()> {
        let native = Program::from_dyn(program.as_ref())?;
        let block_size = native.block().map_or(0, |block| block.size as usize);
        let slot_count = native.slots().len();

        self.uniform_data = vec![0; block_size];
        self.uniform_set = vec![false; slot_count];
        self.sampler_textures = vec![None; slot_count];
        self.program = Some(Arc::clone(program));
        Ok(())
    }

    fn set_uniform(&mut self, uniform: &ActiveUniform, value: UniformValue<'_>) -> Result<()> {
        let program = self.program.clone()
            .ok_or_else(|| engine_err!("focus3d::vulkan", "glUniform: no program in use"))?;
        let native = Program::from_dyn(program.as_ref())?;
        let (index, slot) = self.slot_of(native, uniform)?;

        if value.kind() != slot.uniform.kind {
            engine_bail!("focus3d::vulkan", "glUniform: '{}' in program '{}' is {}, got {}",
                slot.uniform.name, native.name(), slot.uniform.kind, value.kind());
        }

        match (slot.location, &value) {
            (SlotLocation::Sampler { .. }, UniformValue::Texture { texture, .. }) => {
                self.sampler_textures[index] = Some(Arc::clone(texture));
            }
            (SlotLocation::Block { offset }, _) => {
                let bytes = std140_bytes(&value);
                let start = offset as usize;
                let end = start + bytes.len();
                if end > self.uniform_data.len() {
                    engine_bail!("focus3d::vulkan", "glUniform: '{}' overflows the uniform block of '{}'",
                        slot.uniform.name, native.name());
                }
                self.uniform_data[start..end].copy_from_slice(&bytes);
            }
            (SlotLocation::Sampler { .. }, _) => {
                engine_bail!("focus3d::vulkan", "glUniform: sampler '{}' needs a texture", slot.uniform.name);
            }
        }
        self.uniform_set[index] = true;
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: &Arc<dyn RendererGeometry>) -> Result<()> {
        let program = self.program.clone()
            .ok_or_else(|| engine_err!("focus3d::vulkan", "glDrawElements: no program in use"))?;
        let native_program = Program::from_dyn(program.as_ref())?;
        let native_geometry = Geometry::from_dyn(geometry.as_ref())?;

        if let Some(index) = self.uniform_set.iter().position(|set| !set) {
            engine_bail!("focus3d::vulkan", "glDrawElements: uniform '{}' of program '{}' was never set",
                native_program.slots()[index].uniform.name, native_program.name());
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            engine_bail!("focus3d::vulkan", "glDrawElements: empty viewport {:?}", self.viewport);
        }

        self.ensure_recording()?;

        // Sampling an attachment of the bound target reads a copy taken now
        let mut samplers = Vec::new();
        for (index, slot) in native_program.slots().iter().enumerate() {
            let SlotLocation::Sampler { binding } = slot.location else { continue };
            let Some(texture) = self.sampler_textures[index].clone() else { continue };
            let texture = if Framebuffer::from_dyn(self.bound_target.as_ref())?.writes_to(texture.id()) {
                self.snapshot(&texture)?
            } else if texture.info().internal_format.is_depth() {
                engine_bail!("focus3d::vulkan", "Depth texture {} cannot be sampled", texture.id());
            } else {
                texture
            };
            samplers.push((binding, texture));
        }

        self.ensure_render_pass()?;
        let framebuffer = Framebuffer::from_dyn(self.bound_target.as_ref())?;

        let key = PipelineKey {
            program: program.id(),
            color_formats: framebuffer.color_formats().to_vec(),
            depth_format: framebuffer.depth_format(),
            layout: geometry.layout().clone(),
            topology: geometry.topology(),
            draw_buffers: self.draw_buffers,
            depth_test: self.depth_test,
        };
        let render_pass = framebuffer.render_pass;
        let extent = framebuffer.extent();
        let pipeline = self.pipeline_cache.get_or_create(key, &program, render_pass)?;
        let descriptor_set = self.write_descriptor_set(native_program, &samplers)?;

        let viewport = vk::Viewport {
            x: self.viewport.x as f32,
            y: self.viewport.y as f32,
            width: self.viewport.width as f32,
            height: self.viewport.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        unsafe {
            let device = &self.ctx.device;
            let command_buffer = self.command_buffer;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[scissor]);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                native_program.pipeline_layout,
                0,
                &[descriptor_set],
                &[],
            );
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[native_geometry.vertex_buffer()], &[0]);
            device.cmd_bind_index_buffer(command_buffer, native_geometry.index_buffer(), 0, vk::IndexType::UINT32);
            device.cmd_draw_indexed(command_buffer, geometry.index_count(), 1, 0, 0, 0);
        }

        self.frame_resources.programs.push(Arc::clone(&program));
        self.frame_resources.geometries.push(Arc::clone(geometry));
        self.frame_resources.textures.extend(samplers.into_iter().map(|(_, texture)| texture));
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        match self.recording {
            Recording::Implicit => self.submit()?,
            Recording::Frame => {
                engine_warn!("focus3d::vulkan", "begin_frame: discarding a frame that was never ended");
                self.end_render_pass();
            }
            Recording::Idle => {}
        }
        self.start_recording(Recording::Frame)
    }

    fn end_frame(&mut self) -> Result<()> {
        if self.recording == Recording::Idle {
            engine_debug!("focus3d::vulkan", "end_frame: nothing recorded");
            return Ok(());
        }
        self.submit()
    }

    fn wait_idle(&mut self) -> Result<()> {
        if self.recording != Recording::Idle {
            self.submit()?;
        }
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("focus3d::vulkan", "vkDeviceWaitIdle failed: {:?}", e))?;
        }
        self.pipeline_cache.purge_released();
        self.snapshots.clear();
        Ok(())
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            self.frame_resources.clear();
            self.pipeline_cache.shutdown();
            self.sampler_cache.shutdown();

            self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.ctx.device.destroy_fence(self.frame_fence, None);
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
