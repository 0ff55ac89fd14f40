/// Program - Vulkan implementation of the engine NativeProgram trait
///
/// A program is a vertex + fragment module pair plus the descriptor set
/// layout reflected from their SPIR-V. The uniform interface is:
/// - at most one uniform block in set 0, whose members are the scalar,
///   vector and matrix uniforms
/// - combined image samplers in set 0, one per sampler uniform
///
/// Both stages may declare the same block or sampler, as long as the
/// declarations agree.

use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::focus3d::render::{
    ActiveUniform, NativeProgram, ResourceId, ShaderModuleDesc, ShaderProgramDesc, ShaderStage,
    UniformKind,
};
use focus_3d_engine::{engine_debug, engine_error};
use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::std140_size;

/// Where a uniform's value goes when it is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotLocation {
    /// Byte offset inside the uniform block
    Block { offset: u32 },
    /// Combined image sampler binding
    Sampler { binding: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformSlot {
    pub uniform: ActiveUniform,
    pub location: SlotLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub binding: u32,
    pub size: u32,
}

/// Uniform interface of one stage
#[derive(Debug, Default)]
struct StageInterface {
    block: Option<(UniformBlock, Vec<(String, u32, UniformKind)>)>,
    samplers: Vec<(String, u32)>,
}

/// Vulkan program implementation
pub struct Program {
    ctx: Arc<GpuContext>,
    id: ResourceId,
    name: String,
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
    vertex_entry: CString,
    fragment_entry: CString,
    pub(crate) set_layout: vk::DescriptorSetLayout,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    block: Option<UniformBlock>,
    slots: Vec<UniformSlot>,
    active_uniforms: Vec<ActiveUniform>,
}

fn compile_error(stage: ShaderStage, message: String) -> Error {
    engine_error!("focus3d::vulkan", "{} shader: {}", stage, message);
    Error::ShaderCompilation { stage, message }
}

fn is_f32(scalar: &spirq::ty::ScalarType) -> bool {
    matches!(scalar, spirq::ty::ScalarType::Float { bits: 32 })
}

/// Uniform kind of a block member
///
/// GLSL `bool` members arrive as 32-bit integers.
fn member_kind(ty: &spirq::ty::Type) -> Option<UniformKind> {
    use spirq::ty::{ScalarType, Type};
    match ty {
        Type::Scalar(scalar) if is_f32(scalar) => Some(UniformKind::Float),
        Type::Scalar(ScalarType::Boolean) | Type::Scalar(ScalarType::Integer { .. }) => {
            Some(UniformKind::Bool)
        }
        Type::Vector(v) if is_f32(&v.scalar_ty) => match v.nscalar {
            2 => Some(UniformKind::Vec2),
            3 => Some(UniformKind::Vec3),
            4 => Some(UniformKind::Vec4),
            _ => None,
        },
        Type::Matrix(m) if is_f32(&m.vector_ty.scalar_ty) => match (m.nvector, m.vector_ty.nscalar) {
            (3, 3) => Some(UniformKind::Mat3),
            (4, 4) => Some(UniformKind::Mat4),
            _ => None,
        },
        _ => None,
    }
}

fn reflect_stage(module: &ShaderModuleDesc) -> std::result::Result<StageInterface, String> {
    use spirq::ty::DescriptorType;

    let entry_points = spirq::ReflectConfig::new()
        .spv(module.code.as_slice())
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| format!("SPIR-V reflection failed: {:?}", e))?;

    let entry_point = entry_points
        .iter()
        .find(|entry_point| entry_point.name == module.entry_point)
        .ok_or_else(|| format!("entry point '{}' not found", module.entry_point))?;

    let mut interface = StageInterface::default();

    for var in entry_point.vars.iter() {
        match var {
            spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, ty, .. } => {
                let name = name.clone().unwrap_or_default();
                if desc_bind.set() != 0 {
                    return Err(format!(
                        "'{}' is in descriptor set {}, only set 0 is supported",
                        name, desc_bind.set()
                    ));
                }
                match desc_ty {
                    DescriptorType::UniformBuffer() => {
                        if interface.block.is_some() {
                            return Err(format!(
                                "uniform block '{}' at binding {}: only one uniform block is supported",
                                name, desc_bind.bind()
                            ));
                        }
                        let spirq::ty::Type::Struct(block_ty) = ty else {
                            return Err(format!("uniform block '{}' is not a struct", name));
                        };
                        let mut members = Vec::with_capacity(block_ty.members.len());
                        let mut end = 0u32;
                        for member in &block_ty.members {
                            let member_name = member.name.clone().unwrap_or_default();
                            let kind = member_kind(&member.ty).ok_or_else(|| format!(
                                "uniform '{}' has unsupported type {:?}", member_name, member.ty
                            ))?;
                            let offset = member.offset.ok_or_else(|| format!(
                                "uniform '{}' has no block offset", member_name
                            ))? as u32;
                            end = end.max(offset + std140_size(kind) as u32);
                            members.push((member_name, offset, kind));
                        }
                        let size = ty.nbyte().map(|n| n as u32).unwrap_or(end).max(end);
                        interface.block = Some((
                            UniformBlock { binding: desc_bind.bind(), size },
                            members,
                        ));
                    }
                    DescriptorType::CombinedImageSampler() => {
                        interface.samplers.push((name, desc_bind.bind()));
                    }
                    other => {
                        return Err(format!("'{}' has unsupported descriptor type {:?}", name, other));
                    }
                }
            }
            spirq::var::Variable::PushConstant { name, .. } => {
                return Err(format!(
                    "push constant block '{}' is not supported, use a uniform block",
                    name.clone().unwrap_or_default()
                ));
            }
            _ => {}
        }
    }

    Ok(interface)
}

/// Merge the two stage interfaces into the program's slots
fn merge_interfaces(
    vertex: StageInterface,
    fragment: StageInterface,
) -> std::result::Result<(Option<UniformBlock>, Vec<UniformSlot>), String> {
    let block = match (vertex.block, fragment.block) {
        (Some(v), Some(f)) => {
            if v != f {
                return Err(format!(
                    "uniform block at binding {} differs between vertex and fragment stages",
                    f.0.binding
                ));
            }
            Some(v)
        }
        (v, f) => v.or(f),
    };

    let mut samplers = vertex.samplers;
    for (name, binding) in fragment.samplers {
        match samplers.iter().find(|(_, b)| *b == binding) {
            Some((existing, _)) if *existing != name => {
                return Err(format!(
                    "binding {} is '{}' in the vertex stage and '{}' in the fragment stage",
                    binding, existing, name
                ));
            }
            Some(_) => {}
            None => samplers.push((name, binding)),
        }
    }

    if let Some((block, _)) = &block {
        if samplers.iter().any(|(_, binding)| *binding == block.binding) {
            return Err(format!("binding {} is used by both a block and a sampler", block.binding));
        }
    }

    let mut slots = Vec::new();
    let block = block.map(|(block, mut members)| {
        members.sort_by_key(|(_, offset, _)| *offset);
        slots.extend(members.into_iter().map(|(name, offset, kind)| UniformSlot {
            uniform: ActiveUniform::new(name, kind),
            location: SlotLocation::Block { offset },
        }));
        block
    });

    samplers.sort_by_key(|(_, binding)| *binding);
    slots.extend(samplers.into_iter().map(|(name, binding)| UniformSlot {
        uniform: ActiveUniform::new(name, UniformKind::Sampler2D),
        location: SlotLocation::Sampler { binding },
    }));

    Ok((block, slots))
}

fn create_module(ctx: &GpuContext, module: &ShaderModuleDesc) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(&module.code);
    unsafe {
        ctx.device.create_shader_module(&create_info, None)
            .map_err(|e| compile_error(module.stage, format!("vkCreateShaderModule failed: {:?}", e)))
    }
}

fn entry_name(module: &ShaderModuleDesc) -> Result<CString> {
    CString::new(module.entry_point.as_str())
        .map_err(|_| compile_error(module.stage, format!("invalid entry point '{}'", module.entry_point)))
}

impl Program {
    pub(crate) fn new(ctx: &Arc<GpuContext>, desc: &ShaderProgramDesc) -> Result<Self> {
        let vertex_interface = reflect_stage(&desc.vertex)
            .map_err(|message| compile_error(ShaderStage::Vertex, format!("'{}': {}", desc.name, message)))?;
        let fragment_interface = reflect_stage(&desc.fragment)
            .map_err(|message| compile_error(ShaderStage::Fragment, format!("'{}': {}", desc.name, message)))?;
        let (block, slots) = merge_interfaces(vertex_interface, fragment_interface)
            .map_err(|message| compile_error(ShaderStage::Fragment, format!("'{}': {}", desc.name, message)))?;

        let vertex_entry = entry_name(&desc.vertex)?;
        let fragment_entry = entry_name(&desc.fragment)?;

        let stage_flags = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        let mut bindings = Vec::with_capacity(slots.len() + 1);
        if let Some(block) = &block {
            bindings.push(vk::DescriptorSetLayoutBinding::default()
                .binding(block.binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(stage_flags));
        }
        for slot in &slots {
            if let SlotLocation::Sampler { binding } = slot.location {
                bindings.push(vk::DescriptorSetLayoutBinding::default()
                    .binding(binding)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .descriptor_count(1)
                    .stage_flags(stage_flags));
            }
        }

        let vertex_module = create_module(ctx, &desc.vertex)?;
        let fragment_module = match create_module(ctx, &desc.fragment) {
            Ok(module) => module,
            Err(e) => {
                unsafe { ctx.device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let layouts = unsafe {
            let set_layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            ctx.device.create_descriptor_set_layout(&set_layout_info, None)
                .and_then(|set_layout| {
                    let pipeline_layout_info = vk::PipelineLayoutCreateInfo::default()
                        .set_layouts(std::slice::from_ref(&set_layout));
                    match ctx.device.create_pipeline_layout(&pipeline_layout_info, None) {
                        Ok(pipeline_layout) => Ok((set_layout, pipeline_layout)),
                        Err(e) => {
                            ctx.device.destroy_descriptor_set_layout(set_layout, None);
                            Err(e)
                        }
                    }
                })
        };

        let (set_layout, pipeline_layout) = match layouts {
            Ok(layouts) => layouts,
            Err(e) => {
                unsafe {
                    ctx.device.destroy_shader_module(vertex_module, None);
                    ctx.device.destroy_shader_module(fragment_module, None);
                }
                return Err(Error::GraphicsApi(format!(
                    "Failed to create layouts for program '{}': {:?}", desc.name, e
                )));
            }
        };

        let active_uniforms = slots.iter().map(|slot| slot.uniform.clone()).collect();

        engine_debug!("focus3d::vulkan", "Created program '{}' ({} uniforms, block: {} bytes)",
            desc.name, slots.len(), block.map_or(0, |b| b.size));

        Ok(Self {
            ctx: Arc::clone(ctx),
            id: ResourceId::next(),
            name: desc.name.clone(),
            vertex_module,
            fragment_module,
            vertex_entry,
            fragment_entry,
            set_layout,
            pipeline_layout,
            block,
            slots,
            active_uniforms,
        })
    }

    pub(crate) fn stage_infos(&self) -> [vk::PipelineShaderStageCreateInfo<'_>; 2] {
        [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(self.vertex_module)
                .name(&self.vertex_entry),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(self.fragment_module)
                .name(&self.fragment_entry),
        ]
    }

    pub(crate) fn block(&self) -> Option<UniformBlock> {
        self.block
    }

    pub(crate) fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    pub(crate) fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.uniform.name == name)
    }

    /// Downcast an engine program to the Vulkan one
    pub(crate) fn from_dyn(program: &dyn NativeProgram) -> Result<&Program> {
        program.as_any().downcast_ref::<Program>().ok_or_else(|| {
            Error::GraphicsApi(format!("Program '{}' was not created by the Vulkan device", program.name()))
        })
    }
}

impl NativeProgram for Program {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn active_uniforms(&self) -> &[ActiveUniform] {
        &self.active_uniforms
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_descriptor_set_layout(self.set_layout, None);
            self.ctx.device.destroy_shader_module(self.vertex_module, None);
            self.ctx.device.destroy_shader_module(self.fragment_module, None);
        }
    }
}
