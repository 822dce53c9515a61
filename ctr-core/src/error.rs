//! Error types for the CTR drawing pipeline.
//!
//! Malformed input lines are not errors: they become [`crate::model::Diagnostic`]s
//! and the pipeline carries on. `CtrError` covers the cases where no document
//! can be produced at all (I/O, unreadable config) or where the caller asked
//! for strict parsing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtrError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("pdf error: {0}")]
    Pdf(String),
}

impl From<png::DecodingError> for CtrError {
    fn from(e: png::DecodingError) -> Self {
        CtrError::Image(e.to_string())
    }
}

impl From<png::EncodingError> for CtrError {
    fn from(e: png::EncodingError) -> Self {
        CtrError::Image(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CtrError>;
