use std::any::Any;

use crate::pipeline::stream_error::StreamError;

/// One raw frame destined for the encoder's stdin.
///
/// The bytes are opaque to the pipeline; pixel layout is whatever the
/// encoder arguments declare. An empty frame is a skip marker: it is
/// counted but never written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn skip() -> Self {
        Self::default()
    }

    /// Converts a decoded image into packed RGB24 bytes.
    pub fn from_image(image: &image::DynamicImage) -> Self {
        Self::new(image.to_rgb8().into_raw())
    }

    /// Accepts a caller-supplied value only if it is a byte buffer.
    ///
    /// Recognised types: `Frame`, `Vec<u8>`, `Box<[u8]>` and `&'static [u8]`.
    pub fn from_value(value: &dyn Any) -> Result<Self, StreamError> {
        if let Some(frame) = value.downcast_ref::<Frame>() {
            return Ok(frame.clone());
        }
        if let Some(bytes) = value.downcast_ref::<Vec<u8>>() {
            return Ok(Self::new(bytes.clone()));
        }
        if let Some(bytes) = value.downcast_ref::<Box<[u8]>>() {
            return Ok(Self::new(bytes.to_vec()));
        }
        if let Some(bytes) = value.downcast_ref::<&[u8]>() {
            return Ok(Self::new(bytes.to_vec()));
        }
        Err(StreamError::InvalidFrame {
            reason: "frame must be a byte buffer".to_string(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Frame {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}
