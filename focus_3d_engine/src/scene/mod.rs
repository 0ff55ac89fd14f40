//! Scene module
//!
//! Capability traits the pipeline draws from (`Scene`, `Drawable`) and the
//! simple concrete scene the demo uses.

mod scene;
mod scene_object;
mod simple_scene;

pub use scene::{Drawable, RenderData, RenderDataQuery, RenderOptions, Scene};
pub use scene_object::SceneObject;
pub use simple_scene::{SceneObjectKey, SimpleScene};
