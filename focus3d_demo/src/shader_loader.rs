/// Loads the demo's SPIR-V programs from disk into the material factory

use std::path::Path;

use focus_3d_engine::focus3d::material::MaterialFactory;
use focus_3d_engine::focus3d::render::{
    GraphicsDevice, ShaderModuleDesc, ShaderProgramDesc, ShaderStage, BLUR_PROGRAM,
    COMPOSITING_PROGRAM, DOF_PROGRAM, SHADOW_MAP_PROGRAM,
};
use focus_3d_engine::focus3d::{Error, Result};
use focus_3d_engine::{engine_bail, engine_info};

/// Program the scene objects are drawn with in the geometry pass
pub const SOLID_COLOR_PROGRAM: &str = "solid_color";

/// Every program the demo needs
pub const DEMO_PROGRAMS: [&str; 5] = [
    SOLID_COLOR_PROGRAM,
    SHADOW_MAP_PROGRAM,
    COMPOSITING_PROGRAM,
    BLUR_PROGRAM,
    DOF_PROGRAM,
];

/// Reinterpret a SPIR-V file as little-endian words
pub fn spirv_words(path: &Path, bytes: &[u8], stage: ShaderStage) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        engine_bail!("focus3d::Demo", error = Error::ShaderCompilation {
            stage,
            message: format!("{}: {} bytes is not a whole number of SPIR-V words", path.display(), bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}

fn load_module(dir: &Path, program: &str, stage: ShaderStage) -> Result<ShaderModuleDesc> {
    let extension = match stage {
        ShaderStage::Vertex => "vert",
        ShaderStage::Fragment => "frag",
    };
    let path = dir.join(format!("{}.{}.spv", program, extension));
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => engine_bail!("focus3d::Demo", error = Error::ResourceResolution(
            format!("Shader '{}' ({}): {}", program, path.display(), e))),
    };
    Ok(ShaderModuleDesc::new(stage, spirv_words(&path, &bytes, stage)?))
}

/// Create every demo program from `<dir>/<name>.vert.spv` and `<dir>/<name>.frag.spv`
pub fn load_programs(device: &mut dyn GraphicsDevice, factory: &mut MaterialFactory, dir: &Path) -> Result<()> {
    for name in DEMO_PROGRAMS {
        let desc = ShaderProgramDesc {
            name: name.to_string(),
            vertex: load_module(dir, name, ShaderStage::Vertex)?,
            fragment: load_module(dir, name, ShaderStage::Fragment)?,
            uniforms: Vec::new(),
        };
        factory.create_program(device, &desc)?;
    }
    engine_info!("focus3d::Demo", "Loaded {} programs from {}", DEMO_PROGRAMS.len(), dir.display());
    Ok(())
}

#[cfg(test)]
#[path = "shader_loader_tests.rs"]
mod tests;
