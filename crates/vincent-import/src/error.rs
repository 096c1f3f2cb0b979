//! Import pipeline error types.
//!
//! Every failure mode surfaces as a descriptive error; nothing in the
//! pipeline retries. The distinction callers rely on:
//!
//! - [`ImportError::PackageLookupFailed`] deliberately collapses network
//!   failures and unknown-package responses into one error; that
//!   distinction is not preserved at this layer.
//! - [`ImportError::DownloadFailed`] is the single surface for everything
//!   that goes wrong between "start fetching the tarball" and "extraction
//!   finished", wrapping the underlying message.
//! - [`ImportError::MetadataNotFound`] (file absent) is kept distinct from
//!   [`ImportError::MetadataInvalid`] (file present but malformed).

use vincent_store::StoreError;

/// Errors from package import and policy resolution.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The registry query for a packument failed for any reason
    /// (network, unknown package, malformed response).
    #[error("package lookup failed: {message}")]
    PackageLookupFailed {
        /// The underlying failure message.
        message: String,
    },

    /// The packument exists but has no entry for the requested version.
    #[error("version {version} not found for {package}")]
    VersionNotFound {
        /// Package name.
        package: String,
        /// The missing version.
        version: String,
    },

    /// Fetching or extracting the tarball failed.
    #[error("Failed to download and extract package {package}: {message}")]
    DownloadFailed {
        /// `name@version` of the package being imported.
        package: String,
        /// The underlying tool/transport message.
        message: String,
    },

    /// A required generated metadata file is absent from the package.
    #[error("Metadata file {path} not found in {package}")]
    MetadataNotFound {
        /// `name@version` of the package being imported.
        package: String,
        /// Relative path that was expected.
        path: String,
    },

    /// A generated metadata file is present but does not conform to the
    /// build contract.
    #[error("invalid metadata in {package}: {message}")]
    MetadataInvalid {
        /// `name@version` of the package being imported.
        package: String,
        /// What was wrong.
        message: String,
    },

    /// Registry transport failure (non-2xx status, redirect problems,
    /// client construction).
    #[error("registry error: {message}")]
    Registry {
        /// Description of the transport failure.
        message: String,
    },

    /// SRI integrity verification of the downloaded tarball failed.
    #[error("integrity mismatch for {package}: expected {expected}")]
    IntegrityMismatch {
        /// Package that failed verification.
        package: String,
        /// Expected SRI hash string.
        expected: String,
    },

    /// A download URL fell outside the configured registry origin.
    #[error("blocked URL {url}: not within the registry origin")]
    UrlBlocked {
        /// The rejected URL.
        url: String,
    },

    /// The tarball exceeds the configured size ceiling.
    #[error("package too large: {size} bytes (limit: {limit} bytes)")]
    PackageTooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// Archive decoding or unpacking failed.
    #[error("extraction error: {message}")]
    Extraction {
        /// Description of the extraction failure.
        message: String,
    },

    /// An archive entry type that is never extracted (symlink, hardlink,
    /// device node).
    #[error("unsafe archive entry type '{entry_type}' at {path}")]
    UnsafeEntryType {
        /// The rejected entry type.
        entry_type: String,
        /// Path of the entry.
        path: String,
    },

    /// An archive entry path escapes the extraction root.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Policy directory read failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;
