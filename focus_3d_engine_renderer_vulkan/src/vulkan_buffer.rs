/// Buffer - host-visible Vulkan buffer used for geometry, uniforms, staging
/// and readback

use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer with its memory allocation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub(crate) fn new(
        ctx: &Arc<GpuContext>,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<Self> {
        if size == 0 {
            engine_bail!("focus3d::vulkan", "Buffer '{}' has zero size", name);
        }

        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("focus3d::vulkan", "Failed to create buffer '{}': {:?}", name, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate(name, requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                engine_bail!("focus3d::vulkan", "Failed to bind memory of buffer '{}': {:?}", name, e);
            }

            Ok(Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: Some(allocation),
                size,
            })
        }
    }

    /// Create a CPU-to-GPU buffer holding `data`
    pub(crate) fn with_data(
        ctx: &Arc<GpuContext>,
        name: &str,
        data: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        let buffer = Self::new(ctx, name, data.len() as u64, usage, MemoryLocation::CpuToGpu)?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    pub(crate) fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| engine_err!("focus3d::vulkan", "Buffer is not CPU-accessible"))
    }

    /// Copy `data` into the buffer at `offset`
    pub(crate) fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_bail!("focus3d::vulkan",
                "Buffer write of {} bytes at offset {} overflows buffer of {} bytes",
                data.len(), offset, self.size);
        }
        let mapped = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Copy the first `len` bytes out of the buffer
    pub(crate) fn read(&self, len: usize) -> Result<Vec<u8>> {
        if len as u64 > self.size {
            return Err(Error::GraphicsApi(format!(
                "Buffer read of {} bytes exceeds buffer of {} bytes", len, self.size
            )));
        }
        let mapped = self.mapped_ptr()?;
        let mut bytes = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(mapped as *const u8, bytes.as_mut_ptr(), len);
        }
        Ok(bytes)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
