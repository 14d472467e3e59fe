//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Package options not found: {path}")]
    OptionsNotFound { path: String },

    #[error("Invalid package options in {path}: {message}")]
    InvalidOptions { path: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Subdirectory {subdirectory} does not exist in {path}")]
    SubdirectoryNotFound { path: String, subdirectory: String },

    #[error("Archive error: {message}")]
    Archive { message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
