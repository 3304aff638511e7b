use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The caller supplied something that is not a byte buffer.
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },
    /// The encoder closed its stdin while frames were still being written.
    /// Displays as the encoder's decoded stderr output.
    #[error("{diagnostics}")]
    EncoderRejectedInput { diagnostics: String },
    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("encoder command is empty")]
    EmptyCommand,
    #[error("failed to spawn encoder {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("metadata file {path}: {source}")]
    MetadataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("metadata is not valid JSON: {0}")]
    MetadataEncoding(#[source] serde_json::Error),
    #[error("encoder I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}
