/// Unit tests for MaterialFactory

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    ComponentType, InternalFormat, PixelFormat, ShaderModuleDesc, ShaderProgramDesc, ShaderStage,
    TextureDesc, TextureUsage,
};
use crate::material::MaterialFactory;
use std::sync::Arc;

fn desc(name: &str) -> ShaderProgramDesc {
    ShaderProgramDesc {
        name: name.to_string(),
        vertex: ShaderModuleDesc::new(ShaderStage::Vertex, vec![]),
        fragment: ShaderModuleDesc::new(ShaderStage::Fragment, vec![]),
        uniforms: vec![],
    }
}

fn sampled(name: &str) -> TextureDesc {
    TextureDesc {
        name: name.to_string(),
        width: 2,
        height: 2,
        pixel_format: PixelFormat::Rgba,
        component_type: ComponentType::UnsignedByte,
        internal_format: InternalFormat::Rgba8,
        usage: TextureUsage::Sampled,
        data: Some(vec![255; 16]),
    }
}

#[test]
fn test_create_and_lookup_program() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let mut factory = MaterialFactory::new();

    let created = factory.create_program(&mut device, &desc("dof")).unwrap();
    let found = factory.program("dof").unwrap();

    assert!(Arc::ptr_eq(&created, &found));
    assert!(factory.has_program("dof"));
    assert_eq!(factory.program_count(), 1);
}

#[test]
fn test_missing_program_is_resolution_error() {
    let factory = MaterialFactory::new();
    let result = factory.program("gaussian_blur");
    assert!(matches!(result, Err(Error::ResourceResolution(_))));
    assert_eq!(result.unwrap_err().exit_code(), 1);
}

#[test]
fn test_duplicate_program_rejected() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let mut factory = MaterialFactory::new();
    factory.create_program(&mut device, &desc("dof")).unwrap();

    let result = factory.create_program(&mut device, &desc("dof"));
    assert!(matches!(result, Err(Error::ResourceResolution(_))));
}

#[test]
fn test_compilation_error_propagates() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.fail_program_creation = Some(Error::ShaderCompilation {
        stage: ShaderStage::Fragment,
        message: "bad".to_string(),
    });
    let mut factory = MaterialFactory::new();

    let result = factory.create_program(&mut device, &desc("compositing"));
    assert!(matches!(result, Err(Error::ShaderCompilation { .. })));
    assert!(!factory.has_program("compositing"));
}

#[test]
fn test_texture_registry() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let mut factory = MaterialFactory::new();

    let reference = factory.create_texture(&mut device, &sampled("white")).unwrap();
    assert_eq!(reference.name(), "white");
    assert!(factory.texture("white").unwrap().is_alive());
    assert_eq!(factory.texture_count(), 1);

    assert!(factory.remove_texture("white"));
    assert!(!reference.is_alive());
    assert!(matches!(factory.texture("white"), Err(Error::ResourceResolution(_))));
}
