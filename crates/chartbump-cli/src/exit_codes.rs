//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Usage error - missing version, bad image list or working directory
pub const USAGE_ERROR: i32 = 2;

/// No image reference matched the requested images
pub const NO_MATCH: i32 = 3;

/// Everything requested was already at the desired version
pub const NO_CHANGE: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Document error - invalid YAML or a value that cannot be rewritten in place
pub const DOCUMENT_ERROR: i32 = 6;
