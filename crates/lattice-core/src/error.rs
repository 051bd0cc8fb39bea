//! Error types for lattice

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Marker JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LatticeError>;
