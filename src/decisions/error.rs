use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecisionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid decisions in {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to encode decisions: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Structural problems in a persisted decisions document.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed document: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("expected a JSON object with `version` and `decisions`")]
    NotADocument,
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u64, expected: u64 },
    #[error("decision #{index}: {reason}")]
    Entry { index: usize, reason: String },
}

/// An inheritance source could not be read.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to read {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to fetch {location}: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {location}: server responded {status}")]
    Status {
        location: String,
        status: reqwest::StatusCode,
    },
}
