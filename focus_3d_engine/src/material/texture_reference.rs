/// Non-owning reference to a texture owned by a framebuffer (or the factory)
///
/// Holding a reference never keeps the texture alive. Once the owner is
/// rebuilt or released, `upgrade` fails instead of binding stale memory.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::Result;
use crate::engine_bail_warn;
use crate::graphics_device::Texture;

#[derive(Clone)]
pub struct TextureReference {
    name: String,
    texture: Weak<dyn Texture>,
}

impl TextureReference {
    pub fn new(name: impl Into<String>, texture: &Arc<dyn Texture>) -> Self {
        Self {
            name: name.into(),
            texture: Arc::downgrade(texture),
        }
    }

    /// Logical name, e.g. "geometry.color1"
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the texture still exists
    pub fn is_alive(&self) -> bool {
        self.texture.strong_count() > 0
    }

    /// Strong handle for binding
    ///
    /// # Errors
    ///
    /// `InvalidResource` when the owner released the texture.
    pub fn upgrade(&self) -> Result<Arc<dyn Texture>> {
        match self.texture.upgrade() {
            Some(texture) => Ok(texture),
            None => engine_bail_warn!("focus3d::TextureReference",
                "Texture '{}' no longer exists (owner was rebuilt or released)", self.name),
        }
    }
}

impl fmt::Debug for TextureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureReference")
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Two references are equal when they name the same live (or same dead) texture
impl PartialEq for TextureReference {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Weak::ptr_eq(&self.texture, &other.texture)
    }
}
