/// Material module - parameter store, shader programs and the factory that names them

pub mod texture_reference;
pub mod material_parameters;
pub mod shader_program;
pub mod material_factory;

pub use texture_reference::TextureReference;
pub use material_parameters::{MaterialParameterValue, MaterialParameterValues};
pub use shader_program::ShaderProgram;
pub use material_factory::MaterialFactory;
