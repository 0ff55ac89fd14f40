/// Material factory: named registry of shader programs and textures
///
/// The factory owns programs and textures; everything else holds shared
/// `Arc`s (programs) or weak `TextureReference`s (textures).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::{engine_bail, engine_debug};
use crate::graphics_device::{GraphicsDevice, ShaderProgramDesc, Texture, TextureDesc};
use crate::material::{ShaderProgram, TextureReference};

#[derive(Default)]
pub struct MaterialFactory {
    programs: FxHashMap<String, Arc<ShaderProgram>>,
    textures: FxHashMap<String, Arc<dyn Texture>>,
}

impl MaterialFactory {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== PROGRAMS =====

    /// Compile, link and register a program under `desc.name`
    ///
    /// # Errors
    ///
    /// `ShaderCompilation` from the device, or `ResourceResolution` when the
    /// name is already taken.
    pub fn create_program(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: &ShaderProgramDesc,
    ) -> Result<Arc<ShaderProgram>> {
        if self.programs.contains_key(&desc.name) {
            engine_bail!("focus3d::MaterialFactory", error = Error::ResourceResolution(
                format!("Shader program '{}' already exists", desc.name)));
        }
        let program = Arc::new(ShaderProgram::create(device, desc)?);
        engine_debug!("focus3d::MaterialFactory", "Program '{}' created ({} active uniforms)",
            desc.name, program.active_uniforms().len());
        self.programs.insert(desc.name.clone(), Arc::clone(&program));
        Ok(program)
    }

    /// Register an existing program under its own name, replacing any previous one
    pub fn register_program(&mut self, program: Arc<ShaderProgram>) {
        self.programs.insert(program.name().to_string(), program);
    }

    /// Look up a program by name
    ///
    /// # Errors
    ///
    /// `ResourceResolution` when no program has that name.
    pub fn program(&self, name: &str) -> Result<Arc<ShaderProgram>> {
        match self.programs.get(name) {
            Some(program) => Ok(Arc::clone(program)),
            None => engine_bail!("focus3d::MaterialFactory", error = Error::ResourceResolution(
                format!("Shader program '{}' not found", name))),
        }
    }

    pub fn has_program(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    // ===== TEXTURES =====

    /// Create and register a texture under `desc.name`
    pub fn create_texture(&mut self, device: &mut dyn GraphicsDevice, desc: &TextureDesc) -> Result<TextureReference> {
        if self.textures.contains_key(&desc.name) {
            engine_bail!("focus3d::MaterialFactory", error = Error::ResourceResolution(
                format!("Texture '{}' already exists", desc.name)));
        }
        let texture = device.create_texture(desc)?;
        let reference = TextureReference::new(desc.name.clone(), &texture);
        self.textures.insert(desc.name.clone(), texture);
        Ok(reference)
    }

    /// Weak reference to a registered texture
    ///
    /// # Errors
    ///
    /// `ResourceResolution` when no texture has that name.
    pub fn texture(&self, name: &str) -> Result<TextureReference> {
        match self.textures.get(name) {
            Some(texture) => Ok(TextureReference::new(name, texture)),
            None => engine_bail!("focus3d::MaterialFactory", error = Error::ResourceResolution(
                format!("Texture '{}' not found", name))),
        }
    }

    /// Drop a texture; outstanding references stop resolving
    pub fn remove_texture(&mut self, name: &str) -> bool {
        self.textures.remove(name).is_some()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
#[path = "material_factory_tests.rs"]
mod tests;
