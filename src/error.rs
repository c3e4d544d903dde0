use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No saved table exists at the given location
    #[error("no saved table at {}", .0.display())]
    NotFound(PathBuf),
    /// A saved table exists but could not be understood
    #[error("malformed table {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("invalid action id {0}, expected 0..6")]
    InvalidAction(u8),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means there is no usable trained table
    pub fn is_missing_table(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Malformed { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
