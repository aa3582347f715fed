//! Error types for Sleuth.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SleuthError {
    #[error("Unknown evidence field: {0}")]
    UnknownEvidenceField(String),

    #[error("Invalid resource reference: {0}")]
    InvalidResourceRef(String),
}

pub type Result<T> = std::result::Result<T, SleuthError>;
