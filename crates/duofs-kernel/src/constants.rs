//! Mount configuration defaults.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Bytes per chunk alternated between the backends.
pub const DEFAULT_STRIPE_UNIT: usize = 512;

/// Longest physical path accepted, counting the trailing NUL (PATH_MAX).
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Filesystem name shown in the mount table.
pub const FS_NAME: &str = "duofs";

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";
