/// Shader stages, program descriptors and the uniform interface of a program

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::graphics_device::{ResourceId, Texture};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// One compiled stage (SPIR-V words)
#[derive(Debug, Clone)]
pub struct ShaderModuleDesc {
    pub stage: ShaderStage,
    pub code: Vec<u32>,
    pub entry_point: String,
}

impl ShaderModuleDesc {
    pub fn new(stage: ShaderStage, code: Vec<u32>) -> Self {
        Self {
            stage,
            code,
            entry_point: "main".to_string(),
        }
    }
}

/// Descriptor for creating a linked vertex + fragment program
#[derive(Debug, Clone)]
pub struct ShaderProgramDesc {
    /// Name the material factory registers the program under
    pub name: String,
    pub vertex: ShaderModuleDesc,
    pub fragment: ShaderModuleDesc,
    /// Uniform interface for backends that cannot reflect it from `code`.
    /// Reflecting backends ignore it.
    pub uniforms: Vec<ActiveUniform>,
}

// ===== UNIFORM INTERFACE =====

/// Type of a uniform as declared in the shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Bool,
    Sampler2D,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Mat3 => "mat3",
            UniformKind::Mat4 => "mat4",
            UniformKind::Bool => "bool",
            UniformKind::Sampler2D => "sampler2D",
        };
        f.write_str(name)
    }
}

/// A uniform the linked program actually reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveUniform {
    pub name: String,
    pub kind: UniformKind,
}

impl ActiveUniform {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self { name: name.into(), kind }
    }
}

/// Resolved value handed to the device for one uniform
pub enum UniformValue<'a> {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Bool(bool),
    Texture {
        texture: &'a Arc<dyn Texture>,
        unit: u32,
    },
}

impl UniformValue<'_> {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Texture { .. } => UniformKind::Sampler2D,
        }
    }
}

/// Linked device program
pub trait NativeProgram: Send + Sync {
    fn id(&self) -> ResourceId;

    fn name(&self) -> &str;

    /// Uniforms the program reads, in declaration order
    fn active_uniforms(&self) -> &[ActiveUniform];

    fn as_any(&self) -> &dyn Any;
}
