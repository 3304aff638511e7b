use crate::pipeline::stream_error::StreamError;
use crate::shared::frame::Frame;

pub type FrameIter<'a> = Box<dyn Iterator<Item = Result<Frame, StreamError>> + Send + 'a>;

/// Produces the ordered frame sequence for an export.
///
/// `frames` may be called more than once; every call restarts from the
/// first frame so the sequence can be streamed into a second encoder pass.
pub trait FrameSource: Send {
    fn frames(&mut self) -> FrameIter<'_>;

    /// Number of frames per pass, if known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}
