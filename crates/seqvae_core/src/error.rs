//! Error type shared by the engine.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VaeError {
    #[error("encountered empty sample string (sample {index})")]
    EmptySample { index: usize },
    #[error("batch must contain at least one sequence")]
    EmptyBatch,
    #[error("input sequences must be non-empty (sequence {index})")]
    EmptySequence { index: usize },
    #[error("interpolation needs at least one stop, got {0}")]
    InvalidStops(usize),
    #[error("latent vector has {got} components, expected {expected}")]
    LatentShape { expected: usize, got: usize },
    #[error("{path:?} holds a {found} parameter set, expected {expected}")]
    KindMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, VaeError>;
