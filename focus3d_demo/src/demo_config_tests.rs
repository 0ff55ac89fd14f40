use super::*;
use clap::Parser;
use focus_3d_engine::glam::Vec2;

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("focus3d_demo").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_toggle_flips_value() {
    let mut value = true;
    toggle("Solid", &mut value);
    assert!(!value);
    toggle("Solid", &mut value);
    assert!(value);
}

#[test]
fn test_defaults() {
    let config = DemoConfig::from_args(&parse(&[]));

    assert_eq!(config.focus, FocusSettings::default());
    assert!(config.show_solid);
    assert_eq!(config.frames, 1);
    assert_eq!(config.output, PathBuf::from("focus3d.png"));
}

#[test]
fn test_focus_from_cursor_pixel() {
    let config = DemoConfig::from_args(&parse(&[
        "--width", "800", "--height", "600", "--focus-x", "200", "--focus-y", "150",
    ]));

    assert_eq!(config.focus.focus_uv, Vec2::new(0.25, 0.75));
}

#[test]
fn test_focus_steps_narrow_and_stop_at_minimum() {
    let config = DemoConfig::from_args(&parse(&["--focus-steps", "50"]));
    assert!((config.focus.focus_range - 0.01).abs() < 1e-6);
}

#[test]
fn test_negative_focus_steps_widen() {
    let config = DemoConfig::from_args(&parse(&["--focus-steps", "-3"]));
    assert!((config.focus.focus_range - 0.13).abs() < 1e-5);
}

#[test]
fn test_hide_solid() {
    let config = DemoConfig::from_args(&parse(&["--hide-solid", "--frames", "0"]));

    assert!(!config.show_solid);
    assert_eq!(config.frames, 1);
}

#[test]
fn test_focus_x_requires_focus_y() {
    let result = Args::try_parse_from(["focus3d_demo", "--focus-x", "10"]);
    assert!(result.is_err());
}
