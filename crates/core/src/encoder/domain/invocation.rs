use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::shared::constants::METADATA_INPUT_FLAG;

/// Everything needed to start one encoder invocation.
///
/// The output path is appended after `args` at spawn time. When `env` is
/// set it replaces the inherited environment entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationDescriptor {
    pub args: Vec<OsString>,
    pub output_path: PathBuf,
    pub env: Option<HashMap<OsString, OsString>>,
}

impl InvocationDescriptor {
    pub fn new<I, S>(args: I, output_path: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            output_path: output_path.into(),
            env: None,
        }
    }

    pub fn with_env(mut self, env: HashMap<OsString, OsString>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn program(&self) -> Option<&OsString> {
        self.args.first()
    }

    /// Derives the metadata invocation: `-i <metadata_path>` spliced in
    /// right after the program, same output path and environment.
    pub fn with_metadata_input(&self, metadata_path: &Path) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        args.extend(self.args.iter().take(1).cloned());
        args.push(OsString::from(METADATA_INPUT_FLAG));
        args.push(metadata_path.as_os_str().to_os_string());
        args.extend(self.args.iter().skip(1).cloned());
        Self {
            args,
            output_path: self.output_path.clone(),
            env: self.env.clone(),
        }
    }

    /// Full command line as the child sees it, for logging.
    pub fn command_line(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .chain(std::iter::once(self.output_path.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
