use crate::pipeline::stream_error::StreamError;
use crate::pipeline::streaming_session::{EndOfStream, RunResult, StreamingSession};
use crate::shared::constants::DEFAULT_CHANNEL_CAPACITY;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Progress callback: `(frames_supplied, total_frames_if_known)`.
pub type ProgressFn = Box<dyn Fn(usize, Option<usize>) + Send>;

/// Streams a frame source through a session until it drains.
///
/// Decoding runs on a reader thread feeding a bounded channel, so the next
/// frame is being produced while the current one is written to the encoder.
/// When the session asks for the frames again (clean metadata pass), the
/// source is re-read from the start.
pub struct ExportFramesUseCase {
    session: StreamingSession,
    source: Box<dyn FrameSource>,
    channel_capacity: usize,
    on_progress: Option<ProgressFn>,
}

impl ExportFramesUseCase {
    pub fn new(
        session: StreamingSession,
        source: Box<dyn FrameSource>,
        on_progress: Option<ProgressFn>,
    ) -> Self {
        Self {
            session,
            source,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            on_progress,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn execute(mut self) -> Result<RunResult, StreamError> {
        self.session.initialize()?;

        let mut pass = 1;
        loop {
            log::info!("Streaming frames (pass {pass})");
            stream_pass(
                &mut self.session,
                self.source.as_mut(),
                self.channel_capacity,
                self.on_progress.as_deref(),
            )?;
            match self.session.end()? {
                EndOfStream::ResubmitFrames => pass += 1,
                EndOfStream::Drained(result) => return Ok(result),
            }
        }
    }
}

fn stream_pass(
    session: &mut StreamingSession,
    source: &mut dyn FrameSource,
    capacity: usize,
    on_progress: Option<&(dyn Fn(usize, Option<usize>) + Send)>,
) -> Result<(), StreamError> {
    let total = source.len_hint();
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, StreamError>>(capacity);

    std::thread::scope(|scope| {
        scope.spawn(move || {
            for frame in source.frames() {
                if frame_tx.send(frame).is_err() {
                    // Receiver gone: the session failed and stopped reading.
                    break;
                }
            }
        });

        let mut supplied = 0;
        for frame in frame_rx {
            session.supply_frame(frame?)?;
            supplied += 1;
            if let Some(cb) = on_progress {
                cb(supplied, total);
            }
        }
        Ok(())
    })
}
