//! Stable exit codes for digester CLI commands.

/// Command succeeded, including a run skipped because the digest exists.
pub const OK: i32 = 0;
/// A run failed, or the command hit an error (config, I/O).
pub const FAILED: i32 = 1;
/// `digester validate` found header errors.
pub const INVALID: i32 = 2;
