use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use crate::camera::{Camera, SpotLight, Viewpoint};

fn demo_camera() -> Camera {
    let mut camera = Camera::new(16.0 / 9.0);
    camera.set_position(Vec3::new(0.0, 10.0, 50.0));
    camera.look_at(Vec3::ZERO);
    camera
}

fn assert_vec3_near(a: Vec3, b: Vec3) {
    assert!((a - b).length() < 1e-3, "{:?} != {:?}", a, b);
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn test_camera_new() {
    let camera = Camera::new(4.0 / 3.0);

    assert_eq!(camera.position(), Vec3::ZERO);
    assert_eq!(camera.aspect_ratio(), 4.0 / 3.0);
    assert!(camera.near() > 0.0);
    assert!(camera.far() > camera.near());
}

#[test]
fn test_view_matrix_looks_at_target() {
    let camera = demo_camera();
    let view = camera.view_matrix();

    // The target ends up straight ahead, on the -Z axis of view space
    let target_in_view = (view * Vec3::ZERO.extend(1.0)).xyz();
    let distance = Vec3::new(0.0, 10.0, 50.0).length();
    assert_vec3_near(target_in_view, Vec3::new(0.0, 0.0, -distance));

    // The eye is the view-space origin
    let eye_in_view = (view * camera.position().extend(1.0)).xyz();
    assert_vec3_near(eye_in_view, Vec3::ZERO);
}

#[test]
fn test_projection_depth_range() {
    let camera = Camera::new(1.0).with_perspective(1.0, 0.5, 100.0);
    let projection = camera.projection_matrix();

    let near = projection * Vec3::new(0.0, 0.0, -0.5).extend(1.0);
    let far = projection * Vec3::new(0.0, 0.0, -100.0).extend(1.0);
    assert!((near.z / near.w).abs() < 1e-5);
    assert!((far.z / far.w - 1.0).abs() < 1e-5);
}

#[test]
fn test_set_aspect_ratio_changes_projection() {
    let mut camera = demo_camera();
    let before = camera.projection_matrix();

    camera.set_aspect_ratio(1.0);

    assert_ne!(camera.projection_matrix(), before);
    assert_eq!(camera.projection_matrix(), Mat4::perspective_rh(camera.fov_y(), 1.0, camera.near(), camera.far()));
}

#[test]
fn test_view_projection_matrix() {
    let camera = demo_camera();
    assert_eq!(camera.view_projection_matrix(), camera.projection_matrix() * camera.view_matrix());
}

#[test]
fn test_orbit_keeps_distance_and_target() {
    let mut camera = demo_camera();
    let distance = camera.position().length();

    camera.orbit(Vec2::new(0.3, 0.1), Vec3::ZERO);

    assert!((camera.position().length() - distance).abs() < 1e-3);
    assert_eq!(camera.target(), Vec3::ZERO);
    assert_ne!(camera.position(), Vec3::new(0.0, 10.0, 50.0));
}

#[test]
fn test_orbit_yaw_only_keeps_height() {
    let mut camera = demo_camera();
    camera.orbit(Vec2::new(std::f32::consts::FRAC_PI_2, 0.0), Vec3::ZERO);
    assert!((camera.position().y - 10.0).abs() < 1e-3);
}

#[test]
fn test_orbit_does_not_cross_pole() {
    let mut camera = demo_camera();
    for _ in 0..20 {
        camera.orbit(Vec2::new(0.0, 0.5), Vec3::ZERO);
    }
    let direction = camera.position().normalize();
    assert!(direction.dot(Vec3::Y).abs() < 0.995);
}

// ============================================================================
// SpotLight
// ============================================================================

#[test]
fn test_spot_light_square_frustum() {
    let mut light = SpotLight::new();
    light.set_position(Vec3::new(25.0, 40.0, 30.0));
    light.look_at(Vec3::ZERO);

    let projection = light.projection_matrix();
    assert_eq!(projection, Mat4::perspective_rh(light.cone_angle(), 1.0, light.near(), light.far()));
    assert_eq!(light.position(), Vec3::new(25.0, 40.0, 30.0));
}

#[test]
fn test_spot_light_looks_at_target() {
    let mut light = SpotLight::new();
    light.set_position(Vec3::new(25.0, 40.0, 30.0));
    light.look_at(Vec3::ZERO);

    let target_in_view = (light.view_matrix() * Vec3::ZERO.extend(1.0)).xyz();
    assert!(target_in_view.x.abs() < 1e-3);
    assert!(target_in_view.y.abs() < 1e-3);
    assert!(target_in_view.z < 0.0);
}

#[test]
fn test_spot_light_straight_down_is_defined() {
    let mut light = SpotLight::new();
    light.set_position(Vec3::new(0.0, 30.0, 0.0));
    light.look_at(Vec3::ZERO);

    assert!(!light.view_matrix().is_nan());
}
