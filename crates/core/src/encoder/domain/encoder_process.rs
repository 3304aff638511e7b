use std::process::ExitStatus;

use crate::encoder::domain::invocation::InvocationDescriptor;
use crate::pipeline::stream_error::StreamError;

/// What an encoder invocation left behind once its stdin was closed.
#[derive(Debug)]
pub struct EncoderExit {
    /// Everything the encoder wrote to stderr.
    pub diagnostics: Vec<u8>,
    /// `None` when the implementation has no process status to report.
    pub status: Option<ExitStatus>,
}

/// Starts encoder invocations.
///
/// The session depends on this port only, so tests can substitute an
/// in-memory encoder for a real child process.
pub trait EncoderLauncher: Send {
    fn launch(
        &self,
        descriptor: &InvocationDescriptor,
    ) -> Result<Box<dyn EncoderProcess>, StreamError>;
}

/// One running encoder invocation.
///
/// Implementations must release the process on drop even if [`finish`]
/// was never called.
///
/// [`finish`]: EncoderProcess::finish
pub trait EncoderProcess: Send {
    /// Writes one frame to the encoder's stdin. A
    /// [`std::io::ErrorKind::BrokenPipe`] error means the encoder stopped
    /// accepting input.
    fn write_frame(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Closes stdin, waits for the encoder to exit and returns its stderr.
    fn finish(self: Box<Self>) -> Result<EncoderExit, StreamError>;
}
