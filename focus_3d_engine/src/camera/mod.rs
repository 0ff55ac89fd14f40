//! Camera module - viewpoints the pipeline renders from.
//!
//! `Viewpoint` is the capability the passes consume. `Camera` and
//! `SpotLight` are the two implementations the engine ships; both are
//! owned and driven by the caller.

mod viewpoint;
mod camera;
mod spot_light;

pub use viewpoint::Viewpoint;
pub use camera::Camera;
pub use spot_light::SpotLight;
