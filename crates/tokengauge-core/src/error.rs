use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("File error: {0}")]
    File(String),

    #[error("Benchmark cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BenchError>;
