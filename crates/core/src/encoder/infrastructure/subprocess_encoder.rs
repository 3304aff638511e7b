use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encoder::domain::encoder_process::{EncoderExit, EncoderLauncher, EncoderProcess};
use crate::encoder::domain::invocation::InvocationDescriptor;
use crate::pipeline::stream_error::StreamError;

/// Launches the encoder as a child process: frames go to stdin, stderr is
/// captured, stdout is inherited.
pub struct SubprocessLauncher;

impl EncoderLauncher for SubprocessLauncher {
    fn launch(
        &self,
        descriptor: &InvocationDescriptor,
    ) -> Result<Box<dyn EncoderProcess>, StreamError> {
        let (program, args) = descriptor
            .args
            .split_first()
            .ok_or(StreamError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(&descriptor.output_path)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(env) = &descriptor.env {
            command.env_clear().envs(env);
        }

        log::debug!("Spawning encoder: {}", descriptor.command_line());
        let child = command.spawn().map_err(|e| StreamError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source: e,
        })?;

        Ok(Box::new(SubprocessEncoder::new(child)?))
    }
}

/// A running encoder child process.
///
/// stderr is read on a dedicated thread from the moment the child starts,
/// so an encoder that logs heavily cannot block on a full pipe while we are
/// blocked writing its stdin.
pub struct SubprocessEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    drain: Option<JoinHandle<io::Result<Vec<u8>>>>,
}

impl SubprocessEncoder {
    fn new(mut child: Child) -> Result<Self, StreamError> {
        let stdin = child.stdin.take();
        let drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                stderr.read_to_end(&mut buf)?;
                Ok(buf)
            })
        });
        if stdin.is_none() {
            let mut encoder = Self {
                child,
                stdin,
                drain,
            };
            encoder.reap();
            return Err(StreamError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "encoder stdin was not captured",
            )));
        }
        Ok(Self {
            child,
            stdin,
            drain,
        })
    }

    fn join_drain(&mut self) -> io::Result<Vec<u8>> {
        match self.drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| io::Error::other("stderr drain thread panicked"))?,
            None => Ok(Vec::new()),
        }
    }

    fn reap(&mut self) {
        drop(self.stdin.take());
        if let Err(e) = self.child.wait() {
            log::warn!("Failed to wait for encoder process: {e}");
        }
        if let Err(e) = self.join_drain() {
            log::warn!("Failed to read encoder stderr: {e}");
        }
    }
}

impl EncoderProcess for SubprocessEncoder {
    fn write_frame(&mut self, data: &[u8]) -> io::Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "encoder stdin already closed")
        })?;
        stdin.write_all(data)
    }

    fn finish(mut self: Box<Self>) -> Result<EncoderExit, StreamError> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let diagnostics = self.join_drain()?;
        log::debug!("Encoder exited with {status}");
        Ok(EncoderExit {
            diagnostics,
            status: Some(status),
        })
    }
}

impl Drop for SubprocessEncoder {
    fn drop(&mut self) {
        if self.drain.is_some() || self.stdin.is_some() {
            self.reap();
        }
    }
}
