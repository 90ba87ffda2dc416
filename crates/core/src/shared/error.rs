use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by every public model operation.
///
/// Each variant carries a human-readable message; none are retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid option `{key}`: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("failed to load dataset {}: {message}", path.display())]
    DatasetLoad { path: PathBuf, message: String },

    #[error("training failed: {0}")]
    Training(String),

    #[error("{operation} requires a trained or loaded model")]
    NotTrained { operation: &'static str },

    #[error("invalid region {width}x{height} at ({left}, {top}): {reason}")]
    InvalidRegion {
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        reason: &'static str,
    },

    #[error("invalid image dimensions {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("failed to save {}: {message}", path.display())]
    Serialization { path: PathBuf, message: String },

    #[error("failed to load model from {}: {message}", path.display())]
    Deserialization { path: PathBuf, message: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn dataset_load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::DatasetLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Serialization {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn deserialization(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Deserialization {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
