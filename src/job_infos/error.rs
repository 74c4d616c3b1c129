// src/job_infos/error.rs
use thiserror::Error;

use super::ValidationErrors;

#[derive(Debug, Error)]
pub enum JobInfoError {
    /// No identity, or the record is not owned by the caller (or missing)
    #[error("no permission")]
    NoPermission,
    #[error("invalid job data: {0}")]
    InvalidData(ValidationErrors),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl JobInfoError {
    /// Message safe to show the end user
    pub fn message(&self) -> &'static str {
        match self {
            JobInfoError::NoPermission => "You don't have permission to do this.",
            JobInfoError::InvalidData(_) => "Invalid job data.",
            JobInfoError::Storage(_) => "Something went wrong. Please try again.",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            JobInfoError::NoPermission => "NO_PERMISSION",
            JobInfoError::InvalidData(_) => "INVALID_DATA",
            JobInfoError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}
