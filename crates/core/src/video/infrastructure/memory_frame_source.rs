use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameIter, FrameSource};

/// Frames already held in memory.
pub struct MemoryFrameSource {
    frames: Vec<Frame>,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for MemoryFrameSource {
    fn frames(&mut self) -> FrameIter<'_> {
        Box::new(self.frames.iter().cloned().map(Ok))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }
}
