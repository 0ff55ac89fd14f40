/// Per-frame pass ordering
///
/// A frame is Shadow → Clear → Geometry → Compositing → Blur → DepthOfField.
/// Clear may be repeated; Shadow opens a frame before the first one or after
/// DepthOfField closed the previous one.

use std::fmt;

use crate::error::{Error, Result};
use crate::engine_bail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePass {
    Shadow,
    Clear,
    Geometry,
    Compositing,
    Blur,
    DepthOfField,
}

impl FramePass {
    /// Passes in frame order
    pub const ORDER: [FramePass; 6] = [
        FramePass::Shadow,
        FramePass::Clear,
        FramePass::Geometry,
        FramePass::Compositing,
        FramePass::Blur,
        FramePass::DepthOfField,
    ];
}

impl fmt::Display for FramePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePass::Shadow => "Shadow",
            FramePass::Clear => "Clear",
            FramePass::Geometry => "Geometry",
            FramePass::Compositing => "Compositing",
            FramePass::Blur => "Blur",
            FramePass::DepthOfField => "DepthOfField",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameSequencer {
    last: Option<FramePass>,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pass that ran, `None` before the first frame
    pub fn last(&self) -> Option<FramePass> {
        self.last
    }

    /// Pass the next frame step must be
    pub fn expected_next(&self) -> FramePass {
        match self.last {
            None | Some(FramePass::DepthOfField) => FramePass::Shadow,
            Some(FramePass::Shadow) => FramePass::Clear,
            Some(FramePass::Clear) => FramePass::Geometry,
            Some(FramePass::Geometry) => FramePass::Compositing,
            Some(FramePass::Compositing) => FramePass::Blur,
            Some(FramePass::Blur) => FramePass::DepthOfField,
        }
    }

    /// Whether `pass` may run now
    pub fn allows(&self, pass: FramePass) -> bool {
        pass == self.expected_next() || (pass == FramePass::Clear && self.last == Some(FramePass::Clear))
    }

    /// Record that `pass` is about to run
    ///
    /// # Errors
    ///
    /// `PassOutOfOrder` naming the expected pass; the state is left unchanged.
    pub fn advance(&mut self, pass: FramePass) -> Result<()> {
        if !self.allows(pass) {
            engine_bail!("focus3d::Renderer", error = Error::PassOutOfOrder {
                expected: self.expected_next().to_string(),
                found: pass.to_string(),
            });
        }
        self.last = Some(pass);
        Ok(())
    }

    /// Forget the current frame (after a rebuild)
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "frame_sequencer_tests.rs"]
mod tests;
