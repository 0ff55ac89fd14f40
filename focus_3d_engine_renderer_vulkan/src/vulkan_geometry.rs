/// Geometry - Vulkan implementation of the engine Geometry trait
///
/// Vertex and index data live in host-visible buffers written once at creation.

use focus_3d_engine::focus3d::Result;
use focus_3d_engine::focus3d::render::{
    Geometry as RendererGeometry, GeometryDesc, PrimitiveTopology, ResourceId, VertexLayout,
};
use focus_3d_engine::{engine_err, engine_trace, engine_warn_err};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;

pub struct Geometry {
    id: ResourceId,
    name: String,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    layout: VertexLayout,
    topology: PrimitiveTopology,
}

impl Geometry {
    pub(crate) fn new(ctx: &Arc<GpuContext>, desc: &GeometryDesc) -> Result<Self> {
        desc.validate().map_err(|message| engine_warn_err!("focus3d::vulkan", "{}", message))?;
        if desc.vertex_data.is_empty() || desc.indices.is_empty() {
            return Err(engine_warn_err!("focus3d::vulkan",
                "geometry '{}' has no vertices or no indices", desc.name));
        }

        let vertex_buffer = Buffer::with_data(
            ctx,
            &format!("{}.vertices", desc.name),
            &desc.vertex_data,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = Buffer::with_data(
            ctx,
            &format!("{}.indices", desc.name),
            bytemuck::cast_slice::<u32, u8>(&desc.indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        engine_trace!("focus3d::vulkan", "Created geometry '{}' ({} vertices, {} indices)",
            desc.name, desc.vertex_count(), desc.indices.len());

        Ok(Self {
            id: ResourceId::next(),
            name: desc.name.clone(),
            vertex_buffer,
            index_buffer,
            index_count: desc.indices.len() as u32,
            layout: desc.layout.clone(),
            topology: desc.topology,
        })
    }

    pub(crate) fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle()
    }

    pub(crate) fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle()
    }

    /// Downcast an engine geometry to the Vulkan one
    pub(crate) fn from_dyn(geometry: &dyn RendererGeometry) -> Result<&Geometry> {
        geometry.as_any().downcast_ref::<Geometry>().ok_or_else(|| {
            engine_err!("focus3d::vulkan", "Geometry '{}' was not created by the Vulkan device", geometry.name())
        })
    }
}

impl RendererGeometry for Geometry {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn index_count(&self) -> u32 {
        self.index_count
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
