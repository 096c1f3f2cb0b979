//! Safe `.tgz` extraction for registry tarballs.
//!
//! Package tarballs wrap their content in a single top-level directory
//! (conventionally `package/`, but scoped builds vary). Extraction strips
//! that outermost level (entries with nothing left after stripping are
//! the wrapper directory itself and are skipped) and guards against:
//!
//! - Path traversal (`..` components, absolute paths)
//! - Unsafe entry types (symlinks, hardlinks, device nodes)
//! - Excessive entry counts and decompressed size (archive bombs)

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{ImportError, ImportResult};

/// Maximum number of entries allowed in a tarball.
const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total decompressed size (500 MB).
const MAX_UNPACKED_SIZE: u64 = 500 * 1024 * 1024;

/// Extract a gzip-compressed tarball at `tarball` into `dest`, stripping
/// the single outermost directory level.
///
/// `dest` is created if it does not exist. Every entry lands inside
/// `dest`; offending archives fail the whole extraction.
///
/// # Errors
///
/// Returns [`ImportError::Extraction`] on decode/unpack failures and
/// ceiling violations, [`ImportError::PathTraversal`] /
/// [`ImportError::UnsafeEntryType`] on malicious entries.
pub(crate) fn extract_tarball(tarball: &Path, dest: &Path) -> ImportResult<()> {
    let file = File::open(tarball).map_err(|e| ImportError::Extraction {
        message: format!("failed to open tarball {}: {e}", tarball.display()),
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));

    std::fs::create_dir_all(dest).map_err(|e| ImportError::Extraction {
        message: format!("failed to create {}: {e}", dest.display()),
    })?;

    let mut entry_count = 0_usize;
    let mut unpacked_size = 0_u64;

    let entries = archive.entries().map_err(|e| ImportError::Extraction {
        message: format!("failed to read archive entries: {e}"),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ImportError::Extraction {
            message: format!("failed to read archive entry: {e}"),
        })?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(ImportError::Extraction {
                message: format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
            });
        }

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            let entry_path = entry
                .path()
                .map_or_else(|_| "<unknown>".to_string(), |p| p.display().to_string());
            return Err(ImportError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: entry_path,
            });
        }

        let entry_size = entry.header().size().map_err(|e| ImportError::Extraction {
            message: format!("failed to read entry size: {e}"),
        })?;
        unpacked_size = unpacked_size.saturating_add(entry_size);
        if unpacked_size > MAX_UNPACKED_SIZE {
            return Err(ImportError::Extraction {
                message: format!("archive exceeds maximum unpacked size ({MAX_UNPACKED_SIZE} bytes)"),
            });
        }

        let entry_path = entry
            .path()
            .map_err(|e| ImportError::Extraction {
                message: format!("failed to read entry path: {e}"),
            })?
            .into_owned();

        validate_entry_path(&entry_path)?;

        // Same semantics as `tar --strip-components=1`: the wrapper
        // directory entry itself strips to nothing and is skipped.
        let Some(stripped) = strip_outer_dir(&entry_path) else {
            continue;
        };
        let target = dest.join(&stripped);

        // validate_entry_path rejected every escaping component and
        // symlink entries are refused outright, so the joined path must
        // still be inside dest.
        if !target.starts_with(dest) {
            return Err(ImportError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ImportError::Extraction {
                message: format!("failed to create directory {}: {e}", parent.display()),
            })?;
        }

        entry.unpack(&target).map_err(|e| ImportError::Extraction {
            message: format!("failed to unpack {}: {e}", entry_path.display()),
        })?;
    }

    if entry_count == 0 {
        return Err(ImportError::Extraction {
            message: "archive is empty".into(),
        });
    }

    Ok(())
}

/// Whether a tar entry type may be extracted.
///
/// Regular files, directories, and metadata headers only. Symlinks,
/// hardlinks, devices, FIFOs, and sparse entries are refused.
fn is_safe_entry_type(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::Regular
            | tar::EntryType::Directory
            | tar::EntryType::GNULongName
            | tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
    )
}

/// Reject absolute paths and escaping components.
fn validate_entry_path(path: &Path) -> ImportResult<()> {
    if path.is_absolute() {
        return Err(ImportError::PathTraversal {
            path: path.display().to_string(),
        });
    }

    for component in path.components() {
        if matches!(
            component,
            Component::ParentDir | Component::Prefix(_) | Component::RootDir
        ) {
            return Err(ImportError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }

    Ok(())
}

/// Drop the single outermost directory level. `None` when nothing
/// remains (the entry was the wrapper directory itself).
fn strip_outer_dir(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest = components.as_path();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest.to_path_buf())
    }
}
