use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::stream_error::StreamError;

/// A `save_metadata` value as it appears in a format dictionary.
///
/// Format files in the wild carry either a JSON boolean or the strings
/// `"True"`/`"False"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataFlag {
    Bool(bool),
    Text(String),
}

impl MetadataFlag {
    pub fn enabled(&self) -> bool {
        match self {
            MetadataFlag::Bool(value) => *value,
            MetadataFlag::Text(text) => !text.trim().eq_ignore_ascii_case("false"),
        }
    }
}

/// Video format options handed to a session.
///
/// Only `save_metadata` is interpreted; every other key is kept verbatim
/// for callers that build encoder arguments from the same dictionary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_metadata: Option<MetadataFlag>,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl VideoFormat {
    pub fn with_save_metadata(mut self, enabled: bool) -> Self {
        self.save_metadata = Some(MetadataFlag::Bool(enabled));
        self
    }

    pub fn saves_metadata(&self) -> bool {
        self.save_metadata
            .as_ref()
            .map(MetadataFlag::enabled)
            .unwrap_or(false)
    }

    pub fn from_json(json: &str) -> Result<Self, StreamError> {
        serde_json::from_str(json).map_err(StreamError::MetadataEncoding)
    }

    pub fn load(path: &Path) -> Result<Self, StreamError> {
        let json = fs::read_to_string(path).map_err(|e| StreamError::MetadataFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }
}
