//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - invalid package.yaml or chart options
pub const CONFIG_ERROR: i32 = 2;

/// Source error - the upstream could not be pulled
pub const SOURCE_ERROR: i32 = 3;

/// Package error - working directory not prepared, CRDs missing
pub const PACKAGE_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Patch error - recorded changes no longer apply
pub const PATCH_ERROR: i32 = 6;
