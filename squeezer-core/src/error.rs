use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqueezeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Relocation error: {0}")]
    Relocate(String),

    #[error("failed to create directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SqueezeError>;
