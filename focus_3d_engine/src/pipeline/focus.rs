/// Depth-of-field focus state and the interactive adjustment rules

use glam::Vec2;

use crate::engine_info;

/// Narrowest allowed focus band
pub const MIN_FOCUS_RANGE: f32 = 0.01;

/// Step used by `narrow_focus` / `widen_focus`
pub const FOCUS_RANGE_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusSettings {
    /// Focus point in normalized output coordinates, origin bottom-left
    pub focus_uv: Vec2,
    /// Half-width of the sharp band, as a fraction of the depth span
    pub focus_range: f32,
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            focus_uv: Vec2::new(0.5, 0.5),
            focus_range: 0.1,
        }
    }
}

impl FocusSettings {
    /// Focus on the pixel under the cursor (`x`, `y` in window pixels, origin top-left)
    pub fn set_focus_from_cursor(&mut self, x: f32, y: f32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let u = x / width as f32;
        let v = 1.0 - y / height as f32;
        self.focus_uv = Vec2::new(u, v).clamp(Vec2::ZERO, Vec2::ONE);
    }

    pub fn narrow_focus(&mut self) {
        self.adjust_focus_range(-FOCUS_RANGE_STEP);
    }

    pub fn widen_focus(&mut self) {
        self.adjust_focus_range(FOCUS_RANGE_STEP);
    }

    /// Change the focus range by `delta`, never going below `MIN_FOCUS_RANGE`
    pub fn adjust_focus_range(&mut self, delta: f32) {
        self.focus_range = (self.focus_range + delta).max(MIN_FOCUS_RANGE);
        engine_info!("focus3d::Focus", "focusRange = {:.2}", self.focus_range);
    }
}

#[cfg(test)]
#[path = "focus_tests.rs"]
mod tests;
