use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Export failed after {attempts} attempts: {message}")]
    ExportFailed { attempts: u32, message: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
