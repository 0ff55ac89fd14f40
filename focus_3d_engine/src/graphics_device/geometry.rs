/// Indexed geometry: vertex layout, descriptor and device trait

use std::any::Any;

use crate::graphics_device::ResourceId;

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One attribute inside an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset inside the vertex
    pub offset: u32,
}

/// Interleaved vertex layout (single vertex buffer)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Tightly packed layout, locations numbered from 0 in order
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(location, &format)| {
                let attribute = VertexAttribute {
                    location: location as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self { stride: offset, attributes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    LineList,
}

/// Descriptor for creating indexed geometry
#[derive(Debug, Clone)]
pub struct GeometryDesc {
    pub name: String,
    /// Interleaved vertex bytes following `layout`
    pub vertex_data: Vec<u8>,
    pub layout: VertexLayout,
    pub indices: Vec<u32>,
    pub topology: PrimitiveTopology,
}

impl GeometryDesc {
    /// Build from a slice of plain-old-data vertices
    pub fn from_vertices<V: bytemuck::Pod>(
        name: impl Into<String>,
        vertices: &[V],
        layout: VertexLayout,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_data: bytemuck::cast_slice(vertices).to_vec(),
            layout,
            indices,
            topology: PrimitiveTopology::TriangleList,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        if self.layout.stride == 0 {
            return 0;
        }
        (self.vertex_data.len() / self.layout.stride as usize) as u32
    }

    /// Check that every index points at a vertex
    pub fn validate(&self) -> Result<(), String> {
        if self.layout.stride == 0 || self.vertex_data.len() % self.layout.stride as usize != 0 {
            return Err(format!(
                "geometry '{}': {} vertex bytes do not divide into stride {}",
                self.name,
                self.vertex_data.len(),
                self.layout.stride
            ));
        }
        let count = self.vertex_count();
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= count) {
            return Err(format!(
                "geometry '{}': index {} out of range ({} vertices)",
                self.name, bad, count
            ));
        }
        Ok(())
    }
}

/// Geometry living on the device
pub trait Geometry: Send + Sync {
    fn id(&self) -> ResourceId;

    fn name(&self) -> &str;

    fn index_count(&self) -> u32;

    fn layout(&self) -> &VertexLayout;

    fn topology(&self) -> PrimitiveTopology;

    fn as_any(&self) -> &dyn Any;
}
