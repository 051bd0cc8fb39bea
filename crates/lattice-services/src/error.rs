use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Invalid file format: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
