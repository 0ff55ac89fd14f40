/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a resource needs to create and destroy itself:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue and a command pool for one-shot transfer work
///
/// Every resource holds an `Arc<GpuContext>`, so the logical device and the
/// instance are destroyed only after the last texture, buffer or program.

use ash::vk;
use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::{engine_err, engine_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

/// Shared GPU context for all Vulkan resources.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Reusable command pool for one-shot transfer operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    upload_command_pool: Mutex<vk::CommandPool>,

    instance: ash::Instance,

    /// Keeps the Vulkan loader alive until the instance is gone
    _entry: ash::Entry,

    /// Debug utils loader (for validation layers)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            instance,
            _entry: entry,
            debug_utils_loader,
            debug_messenger,
        }
    }

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Allocate device memory for a buffer or image
    ///
    /// # Errors
    ///
    /// `OutOfMemory` when the allocator cannot satisfy the request.
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self.allocator.lock()
            .map_err(|_| engine_err!("focus3d::vulkan", "GPU allocator lock poisoned"))?;

        allocator.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| {
            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
            engine_error!("focus3d::vulkan", "Out of GPU memory for '{}' ({:.2} MB): {:?}", name, size_mb, e);
            Error::OutOfMemory
        })
    }

    /// Return memory to the allocator (never fails; errors are dropped)
    pub(crate) fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Record commands into a fresh command buffer, submit and wait for completion
    pub(crate) fn run_one_shot<F>(&self, label: &str, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self.upload_command_pool.lock()
            .map_err(|_| engine_err!("focus3d::vulkan", "{}: upload command pool lock poisoned", label))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("focus3d::vulkan", "{}: vkAllocateCommandBuffers failed: {:?}", label, e))?;
            let command_buffer = command_buffers[0];

            let result = (|| -> Result<()> {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!("focus3d::vulkan", "{}: vkBeginCommandBuffer failed: {:?}", label, e))?;

                record(&self.device, command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!("focus3d::vulkan", "{}: vkEndCommandBuffer failed: {:?}", label, e))?;

                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("focus3d::vulkan", "{}: vkQueueSubmit failed: {:?}", label, e))?;
                self.device.queue_wait_idle(self.graphics_queue)
                    .map_err(|e| engine_err!("focus3d::vulkan", "{}: vkQueueWaitIdle failed: {:?}", label, e))
            })();

            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Upload command pool
            if let Ok(pool) = self.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 2. Allocator: free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Stop callbacks, then destroy the debug messenger
            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, &self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
