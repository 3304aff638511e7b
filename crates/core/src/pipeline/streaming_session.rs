use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use crate::encoder::domain::encoder_process::{EncoderExit, EncoderLauncher, EncoderProcess};
use crate::encoder::domain::invocation::InvocationDescriptor;
use crate::pipeline::diagnostic_sink::DiagnosticSink;
use crate::pipeline::stream_error::StreamError;
use crate::shared::constants::{EMPTY_FRAME_WARNING, METADATA_DIR};
use crate::shared::frame::Frame;
use crate::shared::metadata_file::write_metadata_file;
use crate::shared::video_format::VideoFormat;

/// How the main pass gets its frames after a clean metadata pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// The caller supplies the whole frame sequence a second time.
    #[default]
    CallerResubmits,
    /// Frames of the metadata pass are buffered and replayed into the main
    /// pass when the metadata pass ends.
    BufferAndReplay,
}

/// Inputs of one streaming session.
#[derive(Clone, Debug)]
pub struct SessionRequest {
    pub invocation: InvocationDescriptor,
    pub format: VideoFormat,
    pub metadata: serde_json::Value,
    pub metadata_dir: PathBuf,
    pub replay: ReplayPolicy,
}

impl SessionRequest {
    pub fn new(
        invocation: InvocationDescriptor,
        format: VideoFormat,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            invocation,
            format,
            metadata,
            metadata_dir: PathBuf::from(METADATA_DIR),
            replay: ReplayPolicy::default(),
        }
    }

    pub fn with_metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = dir.into();
        self
    }

    pub fn with_replay(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingMetadataDecision,
    StreamingMetadataPass,
    MetadataPassDiagnosed,
    AwaitingSecondPassFrames,
    StreamingMainPass,
    Drained,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Metadata,
    Main,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Metadata => write!(f, "metadata"),
            Pass::Main => write!(f, "main"),
        }
    }
}

/// Summary of a drained session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// Frames streamed into the terminal invocation, skipped frames included.
    pub frame_count: usize,
    /// Raw stderr of the terminal invocation; `None` if it wrote nothing.
    pub diagnostics: Option<Vec<u8>>,
    pub terminal_pass: Pass,
    pub status: Option<ExitStatus>,
}

impl RunResult {
    pub fn diagnostics_text(&self) -> Option<String> {
        self.diagnostics
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Outcome of signalling end-of-stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndOfStream {
    /// The metadata pass finished cleanly; supply the full frame sequence
    /// again, then call `end` once more.
    ResubmitFrames,
    Drained(RunResult),
}

/// Drives one or two encoder invocations and relays frames into whichever
/// is active.
///
/// Lifecycle: `new` → `initialize` → `supply_frame`* → `end`. If `end`
/// returns [`EndOfStream::ResubmitFrames`] the caller repeats the
/// `supply_frame`* → `end` cycle for the main pass.
///
/// Never runs two invocations at once: the next one starts only after the
/// previous one's stdin is closed and its stderr fully read.
pub struct StreamingSession {
    request: SessionRequest,
    launcher: Box<dyn EncoderLauncher>,
    sink: Box<dyn DiagnosticSink>,
    state: SessionState,
    active: Option<Box<dyn EncoderProcess>>,
    frame_count: usize,
    replay_buffer: Vec<Frame>,
    result: Option<RunResult>,
}

impl StreamingSession {
    /// Creates an idle session. Nothing is spawned or written yet.
    pub fn new(
        request: SessionRequest,
        launcher: Box<dyn EncoderLauncher>,
        sink: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            request,
            launcher,
            sink,
            state: SessionState::Idle,
            active: None,
            frame_count: 0,
            replay_buffer: Vec::new(),
            result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames relayed into the current invocation so far.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    /// Decides whether a metadata pass runs and starts the first invocation.
    pub fn initialize(&mut self) -> Result<(), StreamError> {
        self.expect_state("initialize", &[SessionState::Idle])?;
        self.transition(SessionState::AwaitingMetadataDecision);

        let first = if self.request.format.saves_metadata() {
            Pass::Metadata
        } else {
            Pass::Main
        };
        self.start_pass_or_fail(first)
    }

    /// Relays one frame. Empty frames are counted and skipped with a warning.
    ///
    /// A broken pipe means the encoder refused further input: the session
    /// fails with [`StreamError::EncoderRejectedInput`] carrying its stderr.
    pub fn supply_frame(&mut self, frame: Frame) -> Result<(), StreamError> {
        self.expect_state(
            "supply a frame",
            &[
                SessionState::StreamingMetadataPass,
                SessionState::AwaitingSecondPassFrames,
                SessionState::StreamingMainPass,
            ],
        )?;
        if self.state == SessionState::AwaitingSecondPassFrames {
            self.start_pass_or_fail(Pass::Main)?;
        }
        self.relay(frame)
    }

    /// Validates an arbitrary caller value as a byte buffer before relaying it.
    ///
    /// Validation happens before any state check or process interaction.
    pub fn supply_value(&mut self, value: &dyn Any) -> Result<(), StreamError> {
        let frame = Frame::from_value(value)?;
        self.supply_frame(frame)
    }

    /// Signals end-of-stream for the active pass.
    pub fn end(&mut self) -> Result<EndOfStream, StreamError> {
        match self.state {
            SessionState::StreamingMetadataPass => {
                let exit = self.finish_active()?;
                if !exit.diagnostics.is_empty() {
                    self.transition(SessionState::MetadataPassDiagnosed);
                    return Ok(self.drain(Pass::Metadata, exit));
                }
                self.warn_on_failed_status(&exit);
                self.transition(SessionState::AwaitingSecondPassFrames);
                match self.request.replay {
                    ReplayPolicy::CallerResubmits => Ok(EndOfStream::ResubmitFrames),
                    ReplayPolicy::BufferAndReplay => self.replay_into_main_pass(),
                }
            }
            SessionState::AwaitingSecondPassFrames => {
                self.start_pass_or_fail(Pass::Main)?;
                self.end_main_pass()
            }
            SessionState::StreamingMainPass => self.end_main_pass(),
            _ => Err(self.invalid_state("end the stream")),
        }
    }

    fn start_metadata_pass(&mut self) -> Result<(), StreamError> {
        let path = write_metadata_file(&self.request.metadata_dir, &self.request.metadata)?;
        log::debug!("Wrote metadata file {}", path.display());
        let descriptor = self.request.invocation.with_metadata_input(&path);
        self.launch(Pass::Metadata, &descriptor)
    }

    fn start_pass(&mut self, pass: Pass) -> Result<(), StreamError> {
        match pass {
            Pass::Metadata => self.start_metadata_pass(),
            Pass::Main => {
                let descriptor = self.request.invocation.clone();
                self.launch(Pass::Main, &descriptor)
            }
        }
    }

    fn start_pass_or_fail(&mut self, pass: Pass) -> Result<(), StreamError> {
        let started = self.start_pass(pass);
        if started.is_err() {
            self.transition(SessionState::Failed);
        }
        started
    }

    fn launch(&mut self, pass: Pass, descriptor: &InvocationDescriptor) -> Result<(), StreamError> {
        self.active = Some(self.launcher.launch(descriptor)?);
        self.frame_count = 0;
        self.sink.info(&format!(
            "Started {pass} encoder pass: {}",
            descriptor.command_line()
        ));
        self.transition(match pass {
            Pass::Metadata => SessionState::StreamingMetadataPass,
            Pass::Main => SessionState::StreamingMainPass,
        });
        Ok(())
    }

    fn relay(&mut self, frame: Frame) -> Result<(), StreamError> {
        if frame.is_empty() {
            self.sink.warning(EMPTY_FRAME_WARNING);
        } else {
            let Some(process) = self.active.as_mut() else {
                return Err(self.invalid_state("supply a frame"));
            };
            if let Err(e) = process.write_frame(frame.data()) {
                return Err(self.fail_on_write(e));
            }
        }
        self.frame_count += 1;

        if self.state == SessionState::StreamingMetadataPass
            && self.request.replay == ReplayPolicy::BufferAndReplay
        {
            self.replay_buffer.push(frame);
        }
        Ok(())
    }

    fn fail_on_write(&mut self, error: std::io::Error) -> StreamError {
        self.transition(SessionState::Failed);
        let Some(process) = self.active.take() else {
            return StreamError::Io(error);
        };
        if error.kind() != std::io::ErrorKind::BrokenPipe {
            // Dropping the process closes stdin and reaps it.
            drop(process);
            return StreamError::Io(error);
        }
        match process.finish() {
            Ok(exit) => StreamError::EncoderRejectedInput {
                diagnostics: String::from_utf8_lossy(&exit.diagnostics).into_owned(),
            },
            Err(e) => e,
        }
    }

    fn replay_into_main_pass(&mut self) -> Result<EndOfStream, StreamError> {
        self.start_pass_or_fail(Pass::Main)?;
        let frames = std::mem::take(&mut self.replay_buffer);
        log::debug!("Replaying {} buffered frames into main pass", frames.len());
        for frame in frames {
            self.relay(frame)?;
        }
        self.end_main_pass()
    }

    fn end_main_pass(&mut self) -> Result<EndOfStream, StreamError> {
        let exit = self.finish_active()?;
        self.warn_on_failed_status(&exit);
        Ok(self.drain(Pass::Main, exit))
    }

    fn finish_active(&mut self) -> Result<EncoderExit, StreamError> {
        let Some(process) = self.active.take() else {
            return Err(self.invalid_state("end the stream"));
        };
        let exit = process.finish();
        if exit.is_err() {
            self.transition(SessionState::Failed);
        }
        exit
    }

    fn drain(&mut self, pass: Pass, exit: EncoderExit) -> EndOfStream {
        let result = RunResult {
            frame_count: self.frame_count,
            diagnostics: (!exit.diagnostics.is_empty()).then_some(exit.diagnostics),
            terminal_pass: pass,
            status: exit.status,
        };
        if let Some(text) = result.diagnostics_text() {
            self.sink.encoder_diagnostics(&text);
        }
        self.sink.info(&format!(
            "Finished {pass} encoder pass: {} frames",
            result.frame_count
        ));
        self.replay_buffer.clear();
        self.transition(SessionState::Drained);
        self.result = Some(result.clone());
        EndOfStream::Drained(result)
    }

    fn warn_on_failed_status(&mut self, exit: &EncoderExit) {
        if let Some(status) = exit.status.filter(|s| !s.success()) {
            if exit.diagnostics.is_empty() {
                self.sink
                    .warning(&format!("Encoder exited with {status} without output"));
            }
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), StreamError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> StreamError {
        StreamError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        log::trace!("Session {} -> {next}", self.state);
        self.state = next;
    }
}
