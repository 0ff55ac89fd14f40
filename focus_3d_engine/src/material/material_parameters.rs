/// Material parameter store
///
/// Named, typed uniform values. Passes build a fallback set from camera and
/// light state, drawables contribute overrides, and `merge` combines the two
/// with overrides winning. Keys iterate in sorted order.

use std::collections::btree_map::{self, BTreeMap};

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::graphics_device::UniformKind;
use crate::material::TextureReference;

// ===== VALUES =====

/// A typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialParameterValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Bool(bool),
    Texture(TextureReference),
}

impl MaterialParameterValue {
    /// Uniform kind this value can be bound to
    pub fn kind(&self) -> UniformKind {
        match self {
            MaterialParameterValue::Float(_) => UniformKind::Float,
            MaterialParameterValue::Vec2(_) => UniformKind::Vec2,
            MaterialParameterValue::Vec3(_) => UniformKind::Vec3,
            MaterialParameterValue::Vec4(_) => UniformKind::Vec4,
            MaterialParameterValue::Mat3(_) => UniformKind::Mat3,
            MaterialParameterValue::Mat4(_) => UniformKind::Mat4,
            MaterialParameterValue::Bool(_) => UniformKind::Bool,
            MaterialParameterValue::Texture(_) => UniformKind::Sampler2D,
        }
    }
}

impl From<f32> for MaterialParameterValue {
    fn from(value: f32) -> Self {
        MaterialParameterValue::Float(value)
    }
}

impl From<Vec2> for MaterialParameterValue {
    fn from(value: Vec2) -> Self {
        MaterialParameterValue::Vec2(value)
    }
}

impl From<Vec3> for MaterialParameterValue {
    fn from(value: Vec3) -> Self {
        MaterialParameterValue::Vec3(value)
    }
}

impl From<Vec4> for MaterialParameterValue {
    fn from(value: Vec4) -> Self {
        MaterialParameterValue::Vec4(value)
    }
}

impl From<Mat3> for MaterialParameterValue {
    fn from(value: Mat3) -> Self {
        MaterialParameterValue::Mat3(value)
    }
}

impl From<Mat4> for MaterialParameterValue {
    fn from(value: Mat4) -> Self {
        MaterialParameterValue::Mat4(value)
    }
}

impl From<bool> for MaterialParameterValue {
    fn from(value: bool) -> Self {
        MaterialParameterValue::Bool(value)
    }
}

impl From<TextureReference> for MaterialParameterValue {
    fn from(value: TextureReference) -> Self {
        MaterialParameterValue::Texture(value)
    }
}

// ===== STORE =====

/// Name → value mapping with unique keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialParameterValues {
    values: BTreeMap<String, MaterialParameterValue>,
}

impl MaterialParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<MaterialParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of `set`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<MaterialParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MaterialParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<MaterialParameterValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MaterialParameterValue> {
        self.values.iter()
    }

    /// Copy every entry of `other` into `self`, replacing existing keys
    pub fn extend_from(&mut self, other: &MaterialParameterValues) {
        for (name, value) in other.iter() {
            self.values.insert(name.clone(), value.clone());
        }
    }

    /// Overrides win; keys found in neither set are absent from the result
    pub fn merge(overrides: &MaterialParameterValues, fallback: &MaterialParameterValues) -> MaterialParameterValues {
        let mut merged = fallback.clone();
        merged.extend_from(overrides);
        merged
    }

    /// Value for `name` from `overrides`, else from `fallback`
    pub fn resolve<'a>(
        name: &str,
        overrides: &'a MaterialParameterValues,
        fallback: &'a MaterialParameterValues,
    ) -> Option<&'a MaterialParameterValue> {
        overrides.get(name).or_else(|| fallback.get(name))
    }
}

impl<'a> IntoIterator for &'a MaterialParameterValues {
    type Item = (&'a String, &'a MaterialParameterValue);
    type IntoIter = btree_map::Iter<'a, String, MaterialParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
#[path = "material_parameters_tests.rs"]
mod tests;
