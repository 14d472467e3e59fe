//! Changeset error types

use chartfork_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("Invalid patch {path}: {message}")]
    PatchParse { path: String, message: String },

    #[error("Patch {path} does not apply: hunk #{hunk} does not match the original file")]
    PatchConflict { path: String, hunk: usize },

    #[error("Patch {patch} targets {path}, which does not exist")]
    PatchTargetMissing { patch: String, path: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChangeError>;
