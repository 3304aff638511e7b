use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::stream_error::StreamError;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameIter, FrameSource};

/// Reads every image in a directory, in file-name order, as RGB24 frames.
///
/// Raw video input has a fixed frame size, so every image must match the
/// dimensions of the first one.
pub struct ImageDirectorySource {
    paths: Vec<PathBuf>,
}

impl ImageDirectorySource {
    pub fn open(dir: &Path) -> Result<Self, StreamError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        log::info!("Found {} images in {}", paths.len(), dir.display());
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageDirectorySource {
    fn frames(&mut self) -> FrameIter<'_> {
        let mut expected: Option<(u32, u32)> = None;
        Box::new(self.paths.iter().map(move |path| {
            let image = image::open(path).map_err(|e| StreamError::Decode {
                path: path.clone(),
                source: e,
            })?;
            let size = (image.width(), image.height());
            match expected {
                None => expected = Some(size),
                Some(first) if first != size => {
                    return Err(StreamError::InvalidFrame {
                        reason: format!(
                            "{} is {}x{}, expected {}x{}",
                            path.display(),
                            size.0,
                            size.1,
                            first.0,
                            first.1
                        ),
                    });
                }
                Some(_) => {}
            }
            Ok(Frame::from_image(&image))
        }))
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.paths.len())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
