pub mod constants;
pub mod frame;
pub mod metadata_file;
pub mod video_format;
