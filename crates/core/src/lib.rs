//! Streams raw frames into an external encoder process.
//!
//! A [`StreamingSession`](pipeline::streaming_session::StreamingSession)
//! owns the encoder lifecycle: an optional metadata pass that injects an
//! ffmpeg metadata file, followed by the main encode. Frames are written to
//! the encoder's stdin; its stderr is captured and reported when the stream
//! ends, or returned as the error when the encoder stops accepting input.

pub mod encoder;
pub mod pipeline;
pub mod shared;
pub mod video;
