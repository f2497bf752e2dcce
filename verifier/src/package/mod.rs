//! Package layout: the zip container, the manifest and its codec, and the
//! per-call extraction workspace.
//!
//! # Sub-modules
//!
//! - [`codec`] — Canonical JSON encoding and decoding of manifests.
//! - [`container`] — Zip container access with path traversal protection.
//! - [`manifest`] — Manifest and signature block types.
//! - [`workspace`] — Uniquely named, scoped extraction directories.

pub mod codec;
pub mod container;
pub mod manifest;
pub mod workspace;

use crate::error::InvalidArgument;
use std::fs;
use std::path::Path;

/// Check that `path` names an existing, readable regular file.
///
/// # Errors
///
/// Returns [`InvalidArgument`] if the file is missing, is not a regular
/// file, or cannot be opened for reading.
///
/// # Examples
///
/// ```
/// use parcel_verifier::package::validate_readable_file;
/// use std::path::Path;
///
/// let result = validate_readable_file(Path::new("/definitely/not/here.pkg"));
/// assert!(result.is_err());
/// ```
pub fn validate_readable_file(path: &Path) -> Result<(), InvalidArgument> {
    let metadata = fs::metadata(path)
        .map_err(|e| InvalidArgument::new(path, format!("file could not be accessed: {e}")))?;
    if !metadata.is_file() {
        return Err(InvalidArgument::new(path, "not a regular file"));
    }
    fs::File::open(path)
        .map_err(|e| InvalidArgument::new(path, format!("file is not readable: {e}")))?;
    Ok(())
}

/// Return the file name of `path` for use in messages, falling back to the
/// full path when it has no final component.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
