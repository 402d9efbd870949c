use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by scan sessions and the tree builder.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("session is busy with another operation")]
    Busy,

    #[error("no completed scan result")]
    NoScanResult,

    #[error("unknown tree node: {0}")]
    UnknownNode(usize),

    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from removing a scanned entry.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("already deleted: {0}")]
    AlreadyDeleted(PathBuf),

    #[error("path is not part of the scan result: {0}")]
    NotTracked(PathBuf),

    #[error("unknown tree node: {0}")]
    UnknownNode(usize),

    #[error("failed to remove {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading the cleanup group configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
