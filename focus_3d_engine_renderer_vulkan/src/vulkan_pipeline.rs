/// PipelineCache - graphics pipelines built on demand from the device state
///
/// GL-style state (bound program, target formats, vertex layout, depth test,
/// draw buffers) is baked into a VkPipeline the first time a draw uses that
/// combination. Viewport and scissor stay dynamic.

use focus_3d_engine::focus3d::Result;
use focus_3d_engine::focus3d::render::{
    InternalFormat, NativeProgram, PrimitiveTopology, ResourceId, VertexLayout,
};
use focus_3d_engine::{engine_debug, engine_err};
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{topology_to_vk, vertex_format_to_vk};
use crate::vulkan_shader::Program;

/// Everything a pipeline depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ResourceId,
    pub color_formats: Vec<InternalFormat>,
    pub depth_format: Option<InternalFormat>,
    pub layout: VertexLayout,
    pub topology: PrimitiveTopology,
    /// Leading color attachments that receive fragment outputs
    pub draw_buffers: u32,
    pub depth_test: bool,
}

pub(crate) struct PipelineCache {
    ctx: Option<Arc<GpuContext>>,
    /// The weak reference tells when the program is gone
    pipelines: FxHashMap<PipelineKey, (vk::Pipeline, Weak<dyn NativeProgram>)>,
}

impl PipelineCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx: Some(ctx),
            pipelines: FxHashMap::default(),
        }
    }

    /// Get the pipeline for `key`, creating it against `render_pass`
    pub(crate) fn get_or_create(
        &mut self,
        key: PipelineKey,
        program: &Arc<dyn NativeProgram>,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        if let Some((pipeline, _)) = self.pipelines.get(&key) {
            return Ok(*pipeline);
        }

        let ctx = self.ctx.as_ref()
            .ok_or_else(|| engine_err!("focus3d::vulkan", "PipelineCache used after shutdown"))?;

        let pipeline = Self::create(ctx, &key, Program::from_dyn(program.as_ref())?, render_pass)?;
        engine_debug!("focus3d::vulkan", "Created pipeline for '{}' ({} color targets, depth test: {})",
            program.name(), key.color_formats.len(), key.depth_test);
        self.pipelines.insert(key, (pipeline, Arc::downgrade(program)));
        Ok(pipeline)
    }

    /// Destroy pipelines whose program has been released
    ///
    /// Only call while no recorded command buffer is pending.
    pub(crate) fn purge_released(&mut self) {
        let Some(ctx) = &self.ctx else { return };
        self.pipelines.retain(|_, (pipeline, program)| {
            if program.strong_count() == 0 {
                unsafe { ctx.device.destroy_pipeline(*pipeline, None) };
                false
            } else {
                true
            }
        });
    }

    fn create(
        ctx: &GpuContext,
        key: &PipelineKey,
        program: &Program,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        let shader_stages = program.stage_infos();

        let vertex_bindings = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: key.layout.stride,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = key.layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: 0,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(key.topology))
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let depth_test = key.depth_test && key.depth_format.is_some();
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(depth_test)
            .depth_write_enable(depth_test)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // Attachments past the draw buffer count keep their contents
        let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..key.color_formats.len())
            .map(|index| {
                let write_mask = if (index as u32) < key.draw_buffers {
                    vk::ColorComponentFlags::RGBA
                } else {
                    vk::ColorComponentFlags::empty()
                };
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(write_mask)
                    .blend_enable(false)
            })
            .collect();

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(program.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            ctx.device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| engine_err!("focus3d::vulkan", "Failed to create graphics pipeline: {:?}", e))?
        };
        Ok(pipelines[0])
    }

    /// Destroy all pipelines and release the GpuContext reference
    pub(crate) fn shutdown(&mut self) {
        if let Some(ctx) = &self.ctx {
            for (_, (pipeline, _)) in self.pipelines.drain() {
                unsafe { ctx.device.destroy_pipeline(pipeline, None); }
            }
        }
        self.ctx = None;
    }
}

impl Drop for PipelineCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
