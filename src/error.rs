use std::io;

/// All error types for the procyon-export pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ProcyonError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Scene error: {0}")]
    Scene(String),
    #[error("Partition error: {0}")]
    Partition(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProcyonError>;
