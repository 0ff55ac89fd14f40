/// UniformArena - per-frame linear allocator for uniform block data
///
/// Each draw pushes a copy of its program's uniform block; the descriptor set
/// points at that copy, so later `set_uniform` calls in the same frame do not
/// disturb draws already recorded. The arena is rewound when a frame begins.

use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::engine_error;
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;

pub(crate) struct UniformArena {
    buffer: Buffer,
    alignment: u64,
    cursor: u64,
}

impl UniformArena {
    pub(crate) fn new(ctx: &Arc<GpuContext>, size: u64, alignment: u64) -> Result<Self> {
        let buffer = Buffer::new(
            ctx,
            "uniform_arena",
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
        )?;
        Ok(Self {
            buffer,
            alignment: alignment.max(1),
            cursor: 0,
        })
    }

    pub(crate) fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Copy `data` into the arena and return its offset
    pub(crate) fn push(&mut self, data: &[u8]) -> Result<u64> {
        let offset = self.cursor.div_ceil(self.alignment) * self.alignment;
        let end = offset + data.len() as u64;
        if end > self.buffer.size() {
            engine_error!("focus3d::vulkan",
                "Uniform arena exhausted: {} bytes requested at offset {} of {}",
                data.len(), offset, self.buffer.size());
            return Err(Error::OutOfMemory);
        }
        self.buffer.write(offset, data)?;
        self.cursor = end;
        Ok(offset)
    }

    pub(crate) fn reset(&mut self) {
        self.cursor = 0;
    }
}
