//! Unit tests for error.rs
//!
//! Tests Error variants, Display output and the exit code mapping.

use crate::error::{Error, Result};
use crate::graphics_device::ShaderStage;

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_shader_compilation_display() {
    let err = Error::ShaderCompilation {
        stage: ShaderStage::Fragment,
        message: "undeclared identifier 'u_blur'".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("fragment"));
    assert!(display.contains("undeclared identifier 'u_blur'"));
}

#[test]
fn test_graphics_api_display() {
    let err = Error::GraphicsApi("vkQueueSubmit: ERROR_DEVICE_LOST".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Graphics API error"));
    assert!(display.contains("vkQueueSubmit"));
}

#[test]
fn test_resource_resolution_display() {
    let err = Error::ResourceResolution("shader program 'dof'".to_string());
    assert!(format!("{}", err).contains("'dof'"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_missing_parameter_display() {
    let err = Error::MissingParameter {
        program: "compositing".to_string(),
        name: "u_lightPos".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("compositing"));
    assert!(display.contains("u_lightPos"));
}

#[test]
fn test_pass_out_of_order_display() {
    let err = Error::PassOutOfOrder {
        expected: "Geometry".to_string(),
        found: "Blur".to_string(),
    };
    let display = format!("{}", err);
    assert!(display.contains("expected Geometry"));
    assert!(display.contains("got Blur"));
}

// ============================================================================
// EXIT CODES
// ============================================================================

#[test]
fn test_exit_code_per_category() {
    let shader = Error::ShaderCompilation {
        stage: ShaderStage::Vertex,
        message: String::new(),
    };
    assert_eq!(shader.exit_code(), 3);
    assert_eq!(Error::GraphicsApi("x".to_string()).exit_code(), 2);
    assert_eq!(Error::OutOfMemory.exit_code(), 2);
    assert_eq!(Error::ResourceResolution("x".to_string()).exit_code(), 1);
    assert_eq!(Error::NotInitialized.exit_code(), 1);
    assert_eq!(Error::InvalidResource("x".to_string()).exit_code(), 1);
}

#[test]
fn test_exit_codes_are_distinct_for_the_three_fatal_categories() {
    let codes = [
        Error::ShaderCompilation { stage: ShaderStage::Vertex, message: String::new() }.exit_code(),
        Error::GraphicsApi(String::new()).exit_code(),
        Error::ResourceResolution(String::new()).exit_code(),
    ];
    assert_ne!(codes[0], codes[1]);
    assert_ne!(codes[1], codes[2]);
    assert_ne!(codes[0], codes[2]);
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::MissingParameter {
        program: "dof".to_string(),
        name: "u_scene".to_string(),
    };
    assert_eq!(err.clone(), err);
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::NotInitialized)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert_eq!(outer(), Err(Error::NotInitialized));
}
