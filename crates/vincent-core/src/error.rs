//! Validation error types.

/// Errors from identity validation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The package name violates npm naming rules for new packages.
    #[error("invalid package name '{name}': {reason}")]
    InvalidPackageName {
        /// The rejected name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// The version string is not an explicit semantic version.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Why the version is invalid.
        reason: String,
    },
}

/// Result type for validation operations.
pub type CoreResult<T> = Result<T, CoreError>;
