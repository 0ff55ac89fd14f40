/// SimpleScene - an ordered list of scene objects.
///
/// Uses a SlotMap for stable keys plus an order list, so removing an object
/// keeps the draw order of the others.

use slotmap::{new_key_type, SlotMap};

use super::scene::{Drawable, Scene};
use super::scene_object::SceneObject;

new_key_type! {
    /// Stable handle to an object in a `SimpleScene`
    pub struct SceneObjectKey;
}

#[derive(Default)]
pub struct SimpleScene {
    objects: SlotMap<SceneObjectKey, SceneObject>,
    order: Vec<SceneObjectKey>,
}

impl SimpleScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object; it is drawn after every existing one
    pub fn add_object(&mut self, object: SceneObject) -> SceneObjectKey {
        let key = self.objects.insert(object);
        self.order.push(key);
        key
    }

    pub fn remove_object(&mut self, key: SceneObjectKey) -> Option<SceneObject> {
        let object = self.objects.remove(key)?;
        self.order.retain(|&k| k != key);
        Some(object)
    }

    pub fn object(&self, key: SceneObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: SceneObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Scene for SimpleScene {
    fn objects(&self) -> Box<dyn Iterator<Item = &dyn Drawable> + '_> {
        Box::new(
            self.order
                .iter()
                .filter_map(move |&key| self.objects.get(key))
                .map(|object| object as &dyn Drawable),
        )
    }
}

#[cfg(test)]
#[path = "simple_scene_tests.rs"]
mod tests;
