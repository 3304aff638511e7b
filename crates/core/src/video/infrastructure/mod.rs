pub mod image_directory_source;
pub mod memory_frame_source;
