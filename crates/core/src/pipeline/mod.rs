pub mod diagnostic_sink;
pub mod export_frames_use_case;
pub mod stream_error;
pub mod streaming_session;
