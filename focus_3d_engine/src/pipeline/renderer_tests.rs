/// Unit tests for the pipeline Renderer, run against MockGraphicsDevice

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::camera::{Camera, SpotLight, Viewpoint};
use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockCommand, MockDraw, MockGraphicsDevice, MockUniform};
use crate::graphics_device::{
    ActiveUniform, BoundTarget, ClearFlags, GeometryDesc, GraphicsDevice, InternalFormat,
    NativeFramebuffer, ResourceId, ShaderModuleDesc, ShaderProgramDesc, ShaderStage, Texture,
    UniformKind, VertexFormat, VertexLayout, Viewport,
};
use crate::material::{MaterialFactory, MaterialParameterValues, TextureReference};
use crate::pipeline::{
    BlurIteration, BlurSource, FocusSettings, FrameInputs, FramePass, FrameStats, Renderer, RendererConfig,
};
use crate::scene::{RenderOptions, SceneObject, SimpleScene};

// ============================================================================
// FIXTURE
// ============================================================================

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn program_desc(name: &str, uniforms: &[(&str, UniformKind)]) -> ShaderProgramDesc {
    ShaderProgramDesc {
        name: name.to_string(),
        vertex: ShaderModuleDesc::new(ShaderStage::Vertex, vec![]),
        fragment: ShaderModuleDesc::new(ShaderStage::Fragment, vec![]),
        uniforms: uniforms.iter().map(|(n, k)| ActiveUniform::new(*n, *k)).collect(),
    }
}

/// Factory with the four pipeline programs and a solid-color material program,
/// each declaring the uniforms its GLSL source reads
fn factory_with_programs(device: &mut MockGraphicsDevice, skip: Option<&str>) -> MaterialFactory {
    use UniformKind::*;
    let programs = [
        program_desc("shadowmap", &[("u_projMat", Mat4), ("u_viewMat", Mat4), ("u_modelMat", Mat4)]),
        program_desc("compositing", &[
            ("u_diffuse", Sampler2D),
            ("u_normal", Sampler2D),
            ("u_position", Sampler2D),
            ("u_depthMap", Sampler2D),
            ("u_shadowMap", Sampler2D),
            ("u_lightPos", Vec3),
            ("u_lightMat", Mat4),
            ("u_lightProjMat", Mat4),
        ]),
        program_desc("gaussian_blur", &[("u_image", Sampler2D), ("u_horizontal", Bool)]),
        program_desc("dof", &[
            ("u_scene", Sampler2D),
            ("u_blur", Sampler2D),
            ("u_depthMap", Sampler2D),
            ("u_focusUV", Vec2),
            ("u_focusRange", Float),
        ]),
        program_desc("solid_color", &[
            ("u_projMat", Mat4),
            ("u_viewMat", Mat4),
            ("u_modelMat", Mat4),
            ("u_normalMat", Mat3),
            ("u_solidColor", Vec4),
            ("u_viewPos", Vec3),
            ("u_near", Float),
            ("u_far", Float),
        ]),
    ];

    let mut factory = MaterialFactory::new();
    for desc in programs.iter().filter(|d| Some(d.name.as_str()) != skip) {
        factory.create_program(device, desc).unwrap();
    }
    factory
}

fn cube_object(device: &mut MockGraphicsDevice, factory: &MaterialFactory, name: &str) -> SceneObject {
    let geometry = device
        .create_geometry(&GeometryDesc::from_vertices(
            name,
            &[[0.0f32; 3]; 3],
            VertexLayout::packed(&[VertexFormat::Float32x3]),
            vec![0, 1, 2],
        ))
        .unwrap();
    SceneObject::new(geometry, factory.program("solid_color").unwrap())
}

fn demo_camera() -> Camera {
    let mut camera = Camera::new(WIDTH as f32 / HEIGHT as f32);
    camera.set_position(Vec3::new(0.0, 10.0, 50.0));
    camera.look_at(Vec3::ZERO);
    camera
}

fn demo_light() -> SpotLight {
    let mut light = SpotLight::new();
    light.set_position(Vec3::new(25.0, 40.0, 30.0));
    light.look_at(Vec3::ZERO);
    light
}

struct Fixture {
    device: MockGraphicsDevice,
    factory: MaterialFactory,
    renderer: Renderer,
    scene: SimpleScene,
    camera: Camera,
    light: SpotLight,
}

impl Fixture {
    /// One drawable at the origin, pipeline initialized at 800x600
    fn new() -> Self {
        let mut device = MockGraphicsDevice::new(WIDTH, HEIGHT);
        let factory = factory_with_programs(&mut device, None);
        let mut renderer = Renderer::new(&mut device, &factory, RendererConfig::default()).unwrap();
        renderer.initialize(&mut device, WIDTH, HEIGHT).unwrap();

        let mut scene = SimpleScene::new();
        scene.add_object(cube_object(&mut device, &factory, "cube"));
        device.clear_commands();

        Self {
            device,
            factory,
            renderer,
            scene,
            camera: demo_camera(),
            light: demo_light(),
        }
    }

    fn render_frame(&mut self) -> FrameStats {
        let inputs = FrameInputs {
            scene: &self.scene,
            camera: &self.camera,
            light: &self.light,
            render_options: RenderOptions::new("solid"),
            focus: FocusSettings::default(),
        };
        self.renderer.render_frame(&mut self.device, &inputs).unwrap()
    }

    fn target_of(framebuffer: Option<&crate::framebuffer::Framebuffer>) -> BoundTarget {
        BoundTarget::Offscreen(framebuffer.unwrap().native().id())
    }

    fn shadow_target(&self) -> BoundTarget {
        Self::target_of(self.renderer.shadow_map_framebuffer())
    }

    fn geometry_target(&self) -> BoundTarget {
        Self::target_of(self.renderer.geometry_framebuffer())
    }

    fn scene_target(&self) -> BoundTarget {
        Self::target_of(self.renderer.scene_color_framebuffer())
    }

    fn blur_target(&self) -> BoundTarget {
        Self::target_of(self.renderer.blur_framebuffer())
    }

    fn draw_with(&self, program: &str) -> MockDraw {
        let draws = self.device.draws_with(program);
        assert_eq!(draws.len(), 1, "expected one '{}' draw", program);
        draws[0].clone()
    }
}

fn texture_id(reference: TextureReference) -> ResourceId {
    reference.upgrade().unwrap().id()
}

fn uniform_texture(draw: &MockDraw, name: &str) -> ResourceId {
    match draw.uniforms.get(name) {
        Some(MockUniform::Texture { texture, .. }) => *texture,
        other => panic!("uniform '{}' is not a texture: {:?}", name, other),
    }
}

// ============================================================================
// CONSTRUCTION AND LIFECYCLE
// ============================================================================

#[test]
fn test_missing_program_fails_construction() {
    for missing in ["compositing", "shadowmap", "gaussian_blur", "dof"] {
        let mut device = MockGraphicsDevice::new(WIDTH, HEIGHT);
        let factory = factory_with_programs(&mut device, Some(missing));

        let result = Renderer::new(&mut device, &factory, RendererConfig::default());

        match result {
            Err(Error::ResourceResolution(message)) => assert!(message.contains(missing)),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("construction succeeded without '{}'", missing),
        }
    }
}

#[test]
fn test_passes_before_initialize_fail() {
    let mut device = MockGraphicsDevice::new(WIDTH, HEIGHT);
    let factory = factory_with_programs(&mut device, None);
    let mut renderer = Renderer::new(&mut device, &factory, RendererConfig::default()).unwrap();
    let scene = SimpleScene::new();
    let light = demo_light();

    assert!(!renderer.is_initialized());
    assert_eq!(renderer.shadow_pass(&mut device, &scene, &light), Err(Error::NotInitialized));
    assert_eq!(renderer.clear(&mut device), Err(Error::NotInitialized));
    assert_eq!(renderer.blur_pass(&mut device), Err(Error::NotInitialized));
    assert!(device.draws().is_empty());
}

#[test]
fn test_initialize_creates_framebuffers() {
    let fixture = Fixture::new();
    let renderer = &fixture.renderer;

    assert_eq!(renderer.size(), Some((WIDTH, HEIGHT)));

    let geometry = renderer.geometry_framebuffer().unwrap();
    assert_eq!((geometry.width(), geometry.height()), (WIDTH, HEIGHT));
    assert_eq!(
        geometry.native().color_formats(),
        &[InternalFormat::Rgba8, InternalFormat::Rgba32F, InternalFormat::Rgba32F, InternalFormat::Rgba32F]
    );

    let shadow = renderer.shadow_map_framebuffer().unwrap();
    assert_eq!((shadow.width(), shadow.height()), (600, 600));
    assert_eq!(shadow.native().color_formats(), &[InternalFormat::Rgba32F]);

    for framebuffer in [renderer.scene_color_framebuffer(), renderer.blur_framebuffer()] {
        let framebuffer = framebuffer.unwrap();
        assert_eq!((framebuffer.width(), framebuffer.height()), (WIDTH, HEIGHT));
        assert_eq!(framebuffer.native().color_formats(), &[InternalFormat::Rgba32F]);
    }
}

#[test]
fn test_initialize_zero_size_rejected() {
    let mut fixture = Fixture::new();
    let result = fixture.renderer.initialize(&mut fixture.device, 0, 600);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_resize_replaces_every_framebuffer() {
    let mut fixture = Fixture::new();
    let renderer = &fixture.renderer;
    let old_references: Vec<TextureReference> = vec![
        renderer.geometry_framebuffer().unwrap().color_attachment(0).unwrap(),
        renderer.geometry_framebuffer().unwrap().color_attachment(3).unwrap(),
        renderer.geometry_framebuffer().unwrap().depth_attachment(),
        renderer.shadow_map_framebuffer().unwrap().color_attachment(0).unwrap(),
        renderer.scene_color_framebuffer().unwrap().color_attachment(0).unwrap(),
        renderer.blur_framebuffer().unwrap().color_attachment(0).unwrap(),
    ];

    fixture.renderer.initialize(&mut fixture.device, 1024, 768).unwrap();

    // Nothing from the 800x600 build is reachable any more
    for reference in &old_references {
        assert!(!reference.is_alive(), "'{}' survived the resize", reference.name());
    }
    let renderer = &fixture.renderer;
    assert_eq!(renderer.size(), Some((1024, 768)));
    for framebuffer in [
        renderer.geometry_framebuffer(),
        renderer.scene_color_framebuffer(),
        renderer.blur_framebuffer(),
    ] {
        let framebuffer = framebuffer.unwrap();
        assert_eq!((framebuffer.width(), framebuffer.height()), (1024, 768));
        let texture = framebuffer.color_attachment(0).unwrap().upgrade().unwrap();
        assert_eq!((texture.info().width, texture.info().height), (1024, 768));
    }
    let shadow = renderer.shadow_map_framebuffer().unwrap();
    assert_eq!((shadow.width(), shadow.height()), (600, 600));

    // The device went idle before anything was rebuilt
    assert_eq!(fixture.device.commands.first(), Some(&MockCommand::WaitIdle));
}

#[test]
fn test_frame_after_resize_uses_new_size() {
    let mut fixture = Fixture::new();
    fixture.renderer.initialize(&mut fixture.device, 1024, 768).unwrap();
    fixture.device.clear_commands();

    fixture.render_frame();

    let dof = fixture.draw_with("dof");
    assert_eq!(dof.viewport, Viewport::full(1024, 768));
    assert_eq!(dof.target, BoundTarget::Default);
}

#[test]
fn test_release_tears_down() {
    let mut fixture = Fixture::new();
    let reference = fixture.renderer.scene_color_framebuffer().unwrap().color_attachment(0).unwrap();

    fixture.renderer.release(&mut fixture.device).unwrap();

    assert!(!fixture.renderer.is_initialized());
    assert!(!reference.is_alive());
    assert_eq!(fixture.renderer.clear(&mut fixture.device), Err(Error::NotInitialized));
}

// ============================================================================
// SEQUENCING
// ============================================================================

#[test]
fn test_out_of_order_pass_fails() {
    let mut fixture = Fixture::new();
    let result = fixture.renderer.compositing_pass(&mut fixture.device, &fixture.light);
    assert!(matches!(result, Err(Error::PassOutOfOrder { .. })));
    assert!(fixture.device.draws().is_empty());
}

#[test]
fn test_clear_is_idempotent() {
    let mut fixture = Fixture::new();
    let Fixture { device, renderer, scene, light, .. } = &mut fixture;

    renderer.shadow_pass(device, scene, light).unwrap();
    renderer.clear(device).unwrap();
    renderer.clear(device).unwrap();

    assert_eq!(renderer.last_pass(), Some(FramePass::Clear));
    assert_eq!(device.bound_target(), BoundTarget::Default);
}

#[test]
fn test_consecutive_frames() {
    let mut fixture = Fixture::new();
    for _ in 0..3 {
        fixture.render_frame();
    }
    assert_eq!(fixture.device.draws_with("dof").len(), 3);
    assert_eq!(fixture.renderer.last_pass(), Some(FramePass::DepthOfField));
}

#[test]
fn test_individual_passes_in_order() {
    let mut fixture = Fixture::new();
    let Fixture { device, renderer, scene, camera, light, .. } = &mut fixture;

    assert_eq!(renderer.shadow_pass(device, scene, light).unwrap(), 1);
    renderer.clear(device).unwrap();
    assert_eq!(renderer.geometry_pass(device, scene, camera, &RenderOptions::new("solid")).unwrap(), 1);
    renderer.compositing_pass(device, light).unwrap();
    renderer.blur_pass(device).unwrap();
    renderer.dof_pass(device, Vec2::new(0.3, 0.7), 0.2).unwrap();

    assert_eq!(device.bound_target(), BoundTarget::Default);
    assert_eq!(device.draws().len(), 6);
}

// ============================================================================
// END TO END
// ============================================================================

#[test]
fn test_end_to_end_frame() {
    let mut fixture = Fixture::new();

    let stats = fixture.render_frame();

    assert_eq!(stats, FrameStats { shadow_draws: 1, geometry_draws: 1 });
    assert_eq!(fixture.device.commands.first(), Some(&MockCommand::BeginFrame));
    assert_eq!(fixture.device.commands.last(), Some(&MockCommand::EndFrame));
    assert_eq!(fixture.device.bound_target(), BoundTarget::Default);

    // Draw order and destinations
    let order: Vec<(String, BoundTarget)> = fixture
        .device
        .draws()
        .iter()
        .map(|d| (d.program.clone(), d.target))
        .collect();
    assert_eq!(
        order,
        vec![
            ("shadowmap".to_string(), fixture.shadow_target()),
            ("solid_color".to_string(), fixture.geometry_target()),
            ("compositing".to_string(), fixture.scene_target()),
            ("gaussian_blur".to_string(), fixture.blur_target()),
            ("gaussian_blur".to_string(), fixture.blur_target()),
            ("dof".to_string(), BoundTarget::Default),
        ]
    );
    // Content was drawn into the default target
    assert_eq!(fixture.device.draws_to(BoundTarget::Default).len(), 1);
}

#[test]
fn test_shadow_pass_state() {
    let mut fixture = Fixture::new();
    fixture.render_frame();
    let shadow_target = fixture.shadow_target();

    let draw = fixture.draw_with("shadowmap");
    assert!(draw.depth_test);
    assert_eq!(draw.viewport, Viewport::full(600, 600));
    assert_eq!(draw.uniforms["u_projMat"], MockUniform::Mat4(fixture.light.projection_matrix()));
    assert_eq!(draw.uniforms["u_viewMat"], MockUniform::Mat4(fixture.light.view_matrix()));
    assert_eq!(draw.uniforms["u_modelMat"], MockUniform::Mat4(Mat4::IDENTITY));

    let clears = fixture.device.clears();
    assert!(clears.contains(&(shadow_target, ClearFlags::COLOR | ClearFlags::DEPTH, [1.0, 1.0, 1.0, 1.0])));
}

#[test]
fn test_shadow_pass_ignores_material_overrides() {
    let mut fixture = Fixture::new();
    let mut scene = SimpleScene::new();
    let translation = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
    scene.add_object(
        cube_object(&mut fixture.device, &fixture.factory, "moved")
            .with_model_matrix(translation)
            .with_parameters(MaterialParameterValues::new().with("u_modelMat", Mat4::IDENTITY)),
    );

    let draws = fixture.renderer.shadow_pass(&mut fixture.device, &scene, &fixture.light).unwrap();

    assert_eq!(draws, 1);
    let draw = fixture.draw_with("shadowmap");
    assert_eq!(draw.uniforms["u_modelMat"], MockUniform::Mat4(translation));
}

#[test]
fn test_geometry_pass_state_and_fallbacks() {
    let mut fixture = Fixture::new();
    fixture.render_frame();

    let draw = fixture.draw_with("solid_color");
    let camera = &fixture.camera;
    assert!(draw.depth_test);
    assert_eq!(draw.viewport, Viewport::full(WIDTH, HEIGHT));
    assert_eq!(draw.draw_buffers, 4);
    assert_eq!(draw.uniforms["u_projMat"], MockUniform::Mat4(camera.projection_matrix()));
    assert_eq!(draw.uniforms["u_viewMat"], MockUniform::Mat4(camera.view_matrix()));
    assert_eq!(draw.uniforms["u_solidColor"], MockUniform::Vec4(Vec4::new(0.0, 0.0, 0.0, 1.0)));
    assert_eq!(draw.uniforms["u_viewPos"], MockUniform::Vec3(Vec3::new(0.0, 10.0, 50.0)));
    assert_eq!(draw.uniforms["u_near"], MockUniform::Float(camera.near()));
    assert_eq!(draw.uniforms["u_far"], MockUniform::Float(camera.far()));

    let geometry_target = fixture.geometry_target();
    let clears = fixture.device.clears();
    assert!(clears.contains(&(geometry_target, ClearFlags::COLOR | ClearFlags::DEPTH, [0.0; 4])));
}

#[test]
fn test_geometry_pass_model_and_normal_matrix() {
    let mut fixture = Fixture::new();
    let model = Mat4::from_scale_rotation_translation(
        Vec3::new(2.0, 1.0, 1.0),
        glam::Quat::from_rotation_y(0.5),
        Vec3::new(1.0, 2.0, 3.0),
    );
    let mut scene = SimpleScene::new();
    scene.add_object(cube_object(&mut fixture.device, &fixture.factory, "cube").with_model_matrix(model));
    let Fixture { device, renderer, camera, light, .. } = &mut fixture;

    renderer.shadow_pass(device, &scene, light).unwrap();
    renderer.clear(device).unwrap();
    renderer.geometry_pass(device, &scene, camera, &RenderOptions::new("solid")).unwrap();

    let draws = device.draws_with("solid_color");
    assert_eq!(draws[0].uniforms["u_modelMat"], MockUniform::Mat4(model));
    assert_eq!(draws[0].uniforms["u_normalMat"], MockUniform::Mat3(Mat3::from_mat4(model)));
}

#[test]
fn test_geometry_draws_equal_present_render_data() {
    let mut fixture = Fixture::new();
    let mut scene = SimpleScene::new();
    for index in 0..5 {
        let mut object = cube_object(&mut fixture.device, &fixture.factory, &format!("cube{}", index));
        if index % 2 == 1 {
            object.set_render_mode("solid", false);
        }
        scene.add_object(object);
    }
    let Fixture { device, renderer, camera, light, .. } = &mut fixture;

    let shadow_draws = renderer.shadow_pass(device, &scene, light).unwrap();
    renderer.clear(device).unwrap();
    let geometry_draws = renderer.geometry_pass(device, &scene, camera, &RenderOptions::new("solid")).unwrap();

    assert_eq!(shadow_draws, 3);
    assert_eq!(geometry_draws, 3);
    let names: Vec<String> = device.draws_with("solid_color").iter().map(|d| d.geometry.clone()).collect();
    assert_eq!(names, vec!["cube0", "cube2", "cube4"]);
}

#[test]
fn test_geometry_pass_with_other_render_mode() {
    let mut fixture = Fixture::new();
    let Fixture { device, renderer, scene, camera, light, .. } = &mut fixture;

    renderer.shadow_pass(device, scene, light).unwrap();
    renderer.clear(device).unwrap();
    let draws = renderer.geometry_pass(device, scene, camera, &RenderOptions::new("wireframe")).unwrap();

    assert_eq!(draws, 0);
}

#[test]
fn test_material_override_wins_in_geometry_pass() {
    let mut fixture = Fixture::new();
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let mut scene = SimpleScene::new();
    scene.add_object(
        cube_object(&mut fixture.device, &fixture.factory, "red")
            .with_parameters(MaterialParameterValues::new().with("u_solidColor", red)),
    );
    let Fixture { device, renderer, camera, light, .. } = &mut fixture;

    renderer.shadow_pass(device, &scene, light).unwrap();
    renderer.clear(device).unwrap();
    renderer.geometry_pass(device, &scene, camera, &RenderOptions::new("solid")).unwrap();

    assert_eq!(device.draws_with("solid_color")[0].uniforms["u_solidColor"], MockUniform::Vec4(red));
}

#[test]
fn test_compositing_pass_inputs() {
    let mut fixture = Fixture::new();
    fixture.render_frame();

    let draw = fixture.draw_with("compositing");
    let geometry = fixture.renderer.geometry_framebuffer().unwrap();
    let shadow = fixture.renderer.shadow_map_framebuffer().unwrap();

    assert!(!draw.depth_test);
    assert_eq!(draw.viewport, Viewport::full(WIDTH, HEIGHT));
    for (index, name) in ["u_diffuse", "u_normal", "u_position", "u_depthMap"].iter().enumerate() {
        assert_eq!(uniform_texture(&draw, name), texture_id(geometry.color_attachment(index).unwrap()));
    }
    assert_eq!(uniform_texture(&draw, "u_shadowMap"), texture_id(shadow.color_attachment(0).unwrap()));
    assert_eq!(draw.uniforms["u_lightPos"], MockUniform::Vec3(Vec3::new(25.0, 40.0, 30.0)));
    assert_eq!(draw.uniforms["u_lightMat"], MockUniform::Mat4(fixture.light.view_matrix()));
    assert_eq!(draw.uniforms["u_lightProjMat"], MockUniform::Mat4(fixture.light.projection_matrix()));

    let scene_target = fixture.scene_target();
    assert!(fixture.device.clears().contains(&(scene_target, ClearFlags::COLOR, [0.0; 4])));
}

#[test]
fn test_blur_ping_pong() {
    let mut fixture = Fixture::new();
    fixture.render_frame();

    let draws = fixture.device.draws_with("gaussian_blur");
    assert_eq!(draws.len(), 2);

    let scene_color = texture_id(fixture.renderer.scene_color_framebuffer().unwrap().color_attachment(0).unwrap());
    let blur = texture_id(fixture.renderer.blur_framebuffer().unwrap().color_attachment(0).unwrap());

    // First horizontal from the lit scene, then vertical from the blur target
    assert_eq!(draws[0].uniforms["u_horizontal"], MockUniform::Bool(true));
    assert_eq!(uniform_texture(draws[0], "u_image"), scene_color);
    assert_eq!(draws[1].uniforms["u_horizontal"], MockUniform::Bool(false));
    assert_eq!(uniform_texture(draws[1], "u_image"), blur);
    assert!(draws.iter().all(|d| d.target == fixture.blur_target()));
}

#[test]
fn test_blur_schedule() {
    let schedule = Renderer::blur_schedule();
    assert_eq!(
        schedule,
        [
            BlurIteration { horizontal: true, source: BlurSource::SceneColor },
            BlurIteration { horizontal: false, source: BlurSource::BlurTarget },
        ]
    );
    // Both directions exactly once
    assert_eq!(schedule.iter().filter(|i| i.horizontal).count(), 1);
    assert_eq!(schedule.iter().filter(|i| !i.horizontal).count(), 1);
}

#[test]
fn test_dof_pass_inputs() {
    let mut fixture = Fixture::new();
    let inputs = FrameInputs {
        scene: &fixture.scene,
        camera: &fixture.camera,
        light: &fixture.light,
        render_options: RenderOptions::new("solid"),
        focus: FocusSettings { focus_uv: Vec2::new(0.25, 0.75), focus_range: 0.05 },
    };
    fixture.renderer.render_frame(&mut fixture.device, &inputs).unwrap();
    let Fixture { device, renderer, .. } = &fixture;

    let draws = device.draws_with("dof");
    let draw = draws[0];
    assert_eq!(draw.target, BoundTarget::Default);
    assert_eq!(draw.viewport, Viewport::full(WIDTH, HEIGHT));
    assert_eq!(draw.uniforms["u_focusUV"], MockUniform::Vec2(Vec2::new(0.25, 0.75)));
    assert_eq!(draw.uniforms["u_focusRange"], MockUniform::Float(0.05));

    let geometry = renderer.geometry_framebuffer().unwrap();
    let scene_color = renderer.scene_color_framebuffer().unwrap();
    let blur = renderer.blur_framebuffer().unwrap();
    assert_eq!(uniform_texture(draw, "u_depthMap"), texture_id(geometry.color_attachment(3).unwrap()));
    assert_eq!(uniform_texture(draw, "u_scene"), texture_id(scene_color.color_attachment(0).unwrap()));
    assert_eq!(uniform_texture(draw, "u_blur"), texture_id(blur.color_attachment(0).unwrap()));
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_draw_failure_aborts_and_unbinds() {
    let mut fixture = Fixture::new();
    fixture.device.fail_next_draw = Some(Error::GraphicsApi("vkCmdDrawIndexed failed".to_string()));
    let Fixture { device, renderer, scene, light, .. } = &mut fixture;

    let result = renderer.shadow_pass(device, scene, light);

    assert_eq!(result, Err(Error::GraphicsApi("vkCmdDrawIndexed failed".to_string())));
    assert_eq!(device.bound_target(), BoundTarget::Default);
}

#[test]
fn test_failed_frame_is_not_submitted() {
    let mut fixture = Fixture::new();
    fixture.device.fail_next_draw = Some(Error::OutOfMemory);

    let inputs = FrameInputs {
        scene: &fixture.scene,
        camera: &fixture.camera,
        light: &fixture.light,
        render_options: RenderOptions::new("solid"),
        focus: FocusSettings::default(),
    };
    let result = fixture.renderer.render_frame(&mut fixture.device, &inputs);

    assert_eq!(result.unwrap_err().exit_code(), 2);
    assert!(!fixture.device.commands.contains(&MockCommand::EndFrame));
}

#[test]
fn test_missing_material_parameter_aborts_geometry_pass() {
    let mut fixture = Fixture::new();
    let program = fixture
        .factory
        .create_program(
            &mut fixture.device,
            &program_desc("textured", &[("u_projMat", UniformKind::Mat4), ("u_albedo", UniformKind::Sampler2D)]),
        )
        .unwrap();
    let geometry = fixture
        .device
        .create_geometry(&GeometryDesc::from_vertices(
            "textured_cube",
            &[[0.0f32; 3]; 3],
            VertexLayout::packed(&[VertexFormat::Float32x3]),
            vec![0, 1, 2],
        ))
        .unwrap();
    let mut scene = SimpleScene::new();
    scene.add_object(SceneObject::new(geometry, Arc::clone(&program)));
    let Fixture { device, renderer, camera, light, .. } = &mut fixture;

    renderer.shadow_pass(device, &scene, light).unwrap();
    renderer.clear(device).unwrap();
    let result = renderer.geometry_pass(device, &scene, camera, &RenderOptions::new("solid"));

    assert_eq!(
        result,
        Err(Error::MissingParameter { program: "textured".to_string(), name: "u_albedo".to_string() })
    );
    assert_eq!(device.bound_target(), BoundTarget::Default);
}
