use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store {path:?} is not a JSON object")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for key {0}")]
    Encode(String, #[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot")]
    Parse(#[from] serde_json::Error),
    #[error("no element with id {0:?}")]
    UnknownElement(String),
}
