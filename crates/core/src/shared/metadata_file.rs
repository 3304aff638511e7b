use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::stream_error::StreamError;
use crate::shared::constants::{COMMENT_KEY, FFMETADATA_HEADER, METADATA_FILE_NAME};

/// Renders metadata as an ffmpeg metadata file carrying a single `comment` tag.
///
/// Backslashes are doubled because ffmpeg treats `\` as an escape
/// character in metadata values.
pub fn render_metadata(metadata: &serde_json::Value) -> Result<String, StreamError> {
    let json = serde_json::to_string(metadata).map_err(StreamError::MetadataEncoding)?;
    Ok(format!(
        "{FFMETADATA_HEADER}\n{COMMENT_KEY}{}",
        json.replace('\\', "\\\\")
    ))
}

/// Writes `metadata.txt` into `dir`, creating the directory if needed.
///
/// The file is overwritten on every call; concurrent sessions must use
/// distinct directories.
pub fn write_metadata_file(
    dir: &Path,
    metadata: &serde_json::Value,
) -> Result<PathBuf, StreamError> {
    fs::create_dir_all(dir).map_err(|e| StreamError::MetadataFile {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = dir.join(METADATA_FILE_NAME);
    let content = render_metadata(metadata)?;
    fs::write(&path, content).map_err(|e| StreamError::MetadataFile {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

/// Parses the `comment` tag of a file produced by [`write_metadata_file`].
pub fn read_metadata_comment(path: &Path) -> Result<serde_json::Value, StreamError> {
    let content = fs::read_to_string(path).map_err(|e| StreamError::MetadataFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let escaped = content
        .lines()
        .find_map(|line| line.strip_prefix(COMMENT_KEY))
        .ok_or_else(|| StreamError::MetadataFile {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "no comment tag in metadata file",
            ),
        })?;
    serde_json::from_str(&escaped.replace("\\\\", "\\")).map_err(StreamError::MetadataEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_starts_with_header() {
        let rendered = render_metadata(&json!({"a": 1})).unwrap();
        assert_eq!(rendered, ";FFMETADATA1\ncomment={\"a\":1}");
    }

    #[test]
    fn test_render_doubles_backslashes() {
        let rendered = render_metadata(&json!({"a": "b\\c"})).unwrap();
        // serde_json already escapes the backslash once; the file doubles it again
        assert!(rendered.ends_with(r#"comment={"a":"b\\\\c"}"#));
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("temp");
        let path = write_metadata_file(&dir, &json!({"prompt": "cat"})).unwrap();
        assert_eq!(path, dir.join("metadata.txt"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(";FFMETADATA1\n"));
    }

    #[test]
    fn test_round_trip_with_backslash() {
        let tmp = tempfile::tempdir().unwrap();
        let metadata = json!({"a": "b\\c"});
        let path = write_metadata_file(tmp.path(), &metadata).unwrap();
        assert_eq!(read_metadata_comment(&path).unwrap(), metadata);
    }

    #[test]
    fn test_round_trip_nested_workflow() {
        let tmp = tempfile::tempdir().unwrap();
        let metadata = json!({
            "workflow": {"nodes": [{"id": 1, "path": "C:\\models\\x.safetensors"}]},
            "prompt": "line one\nline two",
        });
        let path = write_metadata_file(tmp.path(), &metadata).unwrap();
        assert_eq!(read_metadata_comment(&path).unwrap(), metadata);
    }

    #[test]
    fn test_write_overwrites_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_metadata_file(tmp.path(), &json!({"run": 1})).unwrap();
        let path = write_metadata_file(tmp.path(), &json!({"run": 2})).unwrap();
        assert_eq!(read_metadata_comment(&path).unwrap(), json!({"run": 2}));
    }

    #[test]
    fn test_read_without_comment_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("metadata.txt");
        fs::write(&path, ";FFMETADATA1\ntitle=x").unwrap();
        assert!(matches!(
            read_metadata_comment(&path),
            Err(StreamError::MetadataFile { .. })
        ));
    }
}
