/// Directory the metadata side-file is written to, relative to the working directory.
pub const METADATA_DIR: &str = "temp";
pub const METADATA_FILE_NAME: &str = "metadata.txt";

/// First line of an ffmpeg metadata file.
pub const FFMETADATA_HEADER: &str = ";FFMETADATA1";
pub const COMMENT_KEY: &str = "comment=";

/// Flag that inserts the metadata file as an extra encoder input.
pub const METADATA_INPUT_FLAG: &str = "-i";

pub const EMPTY_FRAME_WARNING: &str = "Empty frame skipped";

/// Frames decoded ahead of the encoder by the export reader thread.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
