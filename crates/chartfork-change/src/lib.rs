//! chartfork changesets
//!
//! A forked chart is stored as its upstream plus a changeset: the files the
//! fork added, the files it removed and unified diffs for the text it
//! edited. [`generate_changes`] records the difference between two trees
//! and [`apply_changes`] replays it.

pub mod changes;
pub mod error;
pub mod patch;

pub use changes::{ChangeSummary, apply_changes, generate_changes};
pub use error::{ChangeError, Result};
pub use patch::{FilePatch, unified_diff};
