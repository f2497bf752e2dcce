//! Manifest extraction.
//!
//! Reads the manifest entry straight out of the package container without
//! extracting anything else, decodes it, and optionally writes its
//! canonical encoding to a file. Errors are returned as-is rather than
//! wrapped, since no workspace is involved.

use crate::config::VerifierConfig;
use crate::error::InvalidArgument;
use crate::observer::{NoopObserver, Notifier, PackagingObserver, PackagingOperation};
use crate::package::codec::{ManifestParseError, decode_manifest_bytes, encode_manifest};
use crate::package::container::{ContainerError, PackageContainer};
use crate::package::manifest::Manifest;
use crate::package::{display_name, validate_readable_file};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors returned by manifest extraction.
#[derive(Debug, Error)]
pub enum ExtractManifestError {
    /// The package path is unusable.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// The package has no manifest entry.
    #[error("package '{package}' does not contain a manifest")]
    NotFound {
        /// File name of the package.
        package: String,
    },

    /// The manifest entry could not be decoded.
    #[error("the manifest in package '{package}' is malformed: {source}")]
    Malformed {
        /// File name of the package.
        package: String,
        /// The decode error.
        #[source]
        source: ManifestParseError,
    },

    /// The package could not be opened or the entry could not be read.
    #[error("failed to read package '{package}': {source}")]
    Container {
        /// File name of the package.
        package: String,
        /// The container error.
        #[source]
        source: ContainerError,
    },

    /// The manifest was extracted but could not be written to the output
    /// file. The extracted manifest is still available.
    #[error("unable to write to manifest file {}: {source}", .path.display())]
    ManifestWriteFailed {
        /// The output path.
        path: PathBuf,
        /// The manifest that was extracted.
        manifest: Box<Manifest>,
        /// The write error.
        #[source]
        source: io::Error,
    },
}

impl ExtractManifestError {
    /// The extracted manifest, when only writing it out failed.
    #[must_use]
    pub fn extracted_manifest(&self) -> Option<&Manifest> {
        match self {
            Self::ManifestWriteFailed { manifest, .. } => Some(manifest.as_ref()),
            _ => None,
        }
    }
}

/// Extract the manifest from `package` using the default configuration,
/// optionally writing it to `output`.
///
/// # Errors
///
/// See [`extract_manifest_with`].
pub fn extract_manifest(
    package: &Path,
    output: Option<&Path>,
) -> Result<Manifest, ExtractManifestError> {
    extract_manifest_with(package, output, &VerifierConfig::default(), &NoopObserver)
}

/// Extract the manifest from `package`, reporting progress to `observer`.
///
/// # Errors
///
/// Returns [`ExtractManifestError::InvalidArgument`] if `package` is not a
/// readable file, [`ExtractManifestError::Container`] if it is not a
/// readable archive, [`ExtractManifestError::NotFound`] if it has no
/// manifest entry, [`ExtractManifestError::Malformed`] if the manifest
/// cannot be decoded, and [`ExtractManifestError::ManifestWriteFailed`] if
/// `output` cannot be written.
pub fn extract_manifest_with(
    package: &Path,
    output: Option<&Path>,
    config: &VerifierConfig,
    observer: &dyn PackagingObserver,
) -> Result<Manifest, ExtractManifestError> {
    let notifier = Notifier::new(PackagingOperation::ExtractManifest, observer);
    validate_readable_file(package)?;
    let name = display_name(package);
    notifier.info(format!("Extracting manifest from package '{name}'..."));

    let manifest = read_manifest(package, &name, &config.manifest_file, &notifier)?;

    if let Some(path) = output {
        notifier.verbose(format!("Writing manifest to {}", path.display()));
        if let Err(source) = write_manifest(&manifest, path) {
            return Err(ExtractManifestError::ManifestWriteFailed {
                path: path.to_path_buf(),
                manifest: Box::new(manifest),
                source,
            });
        }
    }

    notifier.success(format!("Manifest extracted from package '{name}'."));
    Ok(manifest)
}

fn read_manifest(
    package: &Path,
    name: &str,
    manifest_file: &str,
    notifier: &Notifier<'_>,
) -> Result<Manifest, ExtractManifestError> {
    let container_error = |source| ExtractManifestError::Container {
        package: name.to_owned(),
        source,
    };
    let mut container = PackageContainer::open(package).map_err(container_error)?;
    let entry = container
        .find_entry(manifest_file)
        .map_err(container_error)?
        .ok_or_else(|| ExtractManifestError::NotFound {
            package: name.to_owned(),
        })?;
    notifier.verbose(format!("Reading manifest entry '{}'", entry.name()));
    let contents = container.read_entry(&entry).map_err(container_error)?;
    decode_manifest_bytes(&contents).map_err(|source| ExtractManifestError::Malformed {
        package: name.to_owned(),
        source,
    })
}

fn write_manifest(manifest: &Manifest, path: &Path) -> io::Result<()> {
    let text = encode_manifest(manifest).map_err(io::Error::other)?;
    std::fs::write(path, text)
}
