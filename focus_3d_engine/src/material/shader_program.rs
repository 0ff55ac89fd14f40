/// Shader program: a linked device program plus its uniform interface
///
/// Programs are immutable once created and shared as `Arc<ShaderProgram>`
/// between the material factory, drawables and the pipeline.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::engine_bail;
use crate::graphics_device::{ActiveUniform, GraphicsDevice, NativeProgram, ShaderProgramDesc, UniformValue};
use crate::material::{MaterialParameterValue, MaterialParameterValues};

pub struct ShaderProgram {
    name: String,
    native: Arc<dyn NativeProgram>,
}

impl ShaderProgram {
    /// Compile and link through the device
    ///
    /// # Errors
    ///
    /// `ShaderCompilation` when a stage fails to compile or the program fails
    /// to link. Nothing is deferred to first use.
    pub fn create(device: &mut dyn GraphicsDevice, desc: &ShaderProgramDesc) -> Result<Self> {
        let native = device.create_program(desc)?;
        Ok(Self::from_native(native))
    }

    /// Wrap an already-linked device program
    pub fn from_native(native: Arc<dyn NativeProgram>) -> Self {
        Self {
            name: native.name().to_string(),
            native,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &Arc<dyn NativeProgram> {
        &self.native
    }

    /// Uniforms the program reads
    pub fn active_uniforms(&self) -> &[ActiveUniform] {
        self.native.active_uniforms()
    }

    /// Make this the active program of the device
    pub fn use_program(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        device.use_program(&self.native)
    }

    /// Bind every active uniform, taking each value from `overrides` first and
    /// `fallback` second
    ///
    /// Names in the sets that the program does not read are ignored. Sampler
    /// uniforms get texture units 0, 1, 2... in interface order.
    ///
    /// # Errors
    ///
    /// - `MissingParameter` when an active uniform is in neither set
    /// - `ParameterTypeMismatch` when a value's kind differs from the uniform's
    /// - `InvalidResource` when a texture reference no longer resolves
    pub fn set_material_parameters(
        &self,
        device: &mut dyn GraphicsDevice,
        overrides: &MaterialParameterValues,
        fallback: &MaterialParameterValues,
    ) -> Result<()> {
        let mut next_unit = 0u32;

        for uniform in self.native.active_uniforms() {
            let value = match MaterialParameterValues::resolve(&uniform.name, overrides, fallback) {
                Some(value) => value,
                None => engine_bail!("focus3d::ShaderProgram", error = Error::MissingParameter {
                    program: self.name.clone(),
                    name: uniform.name.clone(),
                }),
            };

            if value.kind() != uniform.kind {
                engine_bail!("focus3d::ShaderProgram", error = Error::ParameterTypeMismatch {
                    program: self.name.clone(),
                    name: uniform.name.clone(),
                    expected: uniform.kind.to_string(),
                    found: value.kind().to_string(),
                });
            }

            match value {
                MaterialParameterValue::Float(v) => device.set_uniform(uniform, UniformValue::Float(*v))?,
                MaterialParameterValue::Vec2(v) => device.set_uniform(uniform, UniformValue::Vec2(*v))?,
                MaterialParameterValue::Vec3(v) => device.set_uniform(uniform, UniformValue::Vec3(*v))?,
                MaterialParameterValue::Vec4(v) => device.set_uniform(uniform, UniformValue::Vec4(*v))?,
                MaterialParameterValue::Mat3(v) => device.set_uniform(uniform, UniformValue::Mat3(*v))?,
                MaterialParameterValue::Mat4(v) => device.set_uniform(uniform, UniformValue::Mat4(*v))?,
                MaterialParameterValue::Bool(v) => device.set_uniform(uniform, UniformValue::Bool(*v))?,
                MaterialParameterValue::Texture(reference) => {
                    let texture = reference.upgrade()?;
                    device.set_uniform(uniform, UniformValue::Texture { texture: &texture, unit: next_unit })?;
                    next_unit += 1;
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("uniforms", &self.native.active_uniforms())
            .finish()
    }
}

#[cfg(test)]
#[path = "shader_program_tests.rs"]
mod tests;
