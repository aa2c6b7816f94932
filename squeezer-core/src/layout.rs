//! The three directories a file moves through.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SqueezeError};

/// Case-sensitive suffix a file name must carry to be picked up.
pub const VIDEO_SUFFIX: &str = ".mp4";

/// Incoming (watched), output (compressed results) and archive (originals
/// after success) directories.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryLayout {
    pub incoming: PathBuf,
    pub output: PathBuf,
    pub archive: PathBuf,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            incoming: PathBuf::from("./videos"),
            output: PathBuf::from("./compressed"),
            archive: PathBuf::from("./done"),
        }
    }
}

impl DirectoryLayout {
    pub fn new(
        incoming: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        archive: impl Into<PathBuf>,
    ) -> Self {
        Self {
            incoming: incoming.into(),
            output: output.into(),
            archive: archive.into(),
        }
    }

    /// Create all three directories. Safe to call repeatedly.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.incoming, &self.output, &self.archive] {
            std::fs::create_dir_all(dir).map_err(|source| SqueezeError::Directory {
                path: dir.clone(),
                source,
            })?;
            debug!("ensured directory {}", dir.display());
        }
        Ok(())
    }

    /// Where the compressed copy of `source` lives.
    pub fn output_path_for(&self, source: &Path) -> Option<PathBuf> {
        base_name(source).map(|name| self.output.join(name))
    }

    /// Where `source` goes once compression succeeded.
    pub fn archive_path_for(&self, source: &Path) -> Option<PathBuf> {
        base_name(source).map(|name| self.archive.join(name))
    }

    /// Hidden sibling of the output path the transcoder writes into before
    /// the result is renamed into place.
    pub fn staging_path_for(&self, source: &Path) -> Option<PathBuf> {
        base_name(source).map(|name| {
            let mut staged = std::ffi::OsString::from(".");
            staged.push(name);
            staged.push(".partial");
            self.output.join(staged)
        })
    }
}

pub fn base_name(path: &Path) -> Option<&OsStr> {
    path.file_name()
}

/// True when the final path component ends with [`VIDEO_SUFFIX`].
pub fn has_video_suffix(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.as_encoded_bytes().ends_with(VIDEO_SUFFIX.as_bytes()))
        .unwrap_or(false)
}
