//! Error types for package verification.
//!
//! [`PackageError`] is the verification-path taxonomy. Every failure that
//! happens after the extraction workspace exists is wrapped in a single
//! [`VerifyError::PackageInvalid`] naming the package, after the workspace
//! has been released.

use crate::package::codec::ManifestParseError;
use crate::package::container::ContainerError;
use crate::package::workspace::WorkspaceError;
use crate::trust::keys::KeyFetchError;
use crate::trust::signature::SignatureError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A caller-supplied path that cannot be used.
#[derive(Debug, Error)]
#[error("invalid argument {}: {reason}", .path.display())]
pub struct InvalidArgument {
    /// The rejected path.
    pub path: PathBuf,
    /// Why the path was rejected.
    pub reason: String,
}

impl InvalidArgument {
    /// Create an error for `path`.
    #[must_use]
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// A package that lacks a required part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// No manifest entry in the package.
    #[error("it does not contain a manifest")]
    MissingManifest,

    /// No payload archive entry in the package.
    #[error("it does not contain a payload archive")]
    MissingPayloadArchive,

    /// The payload archive extracted to no files.
    #[error("the payload directory does not contain any files")]
    EmptyPayload,

    /// The manifest carries a trust signature without a digest signature.
    #[error("the manifest is trusted but contains no digest to trust")]
    TrustWithoutDigest,
}

/// Which signature in the manifest failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStage {
    /// The root authority's signature over the digest.
    Trust,
    /// The publisher's signature over the manifest.
    Digest,
}

impl fmt::Display for SignatureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trust => f.write_str("trust"),
            Self::Digest => f.write_str("digest"),
        }
    }
}

/// Failures on the verification path.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The package is missing a manifest or payload.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The package or payload archive could not be opened or extracted.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An extracted file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be decoded.
    #[error("the manifest is malformed: {0}")]
    MalformedManifest(#[from] ManifestParseError),

    /// The trust signature verified but endorses a different digest.
    #[error("the trusted digest does not match the digest in the manifest")]
    TrustInvalid,

    /// The digest signature verified but covers different manifest content.
    #[error("the verified digest does not match the manifest")]
    DigestInvalid,

    /// A signature failed cryptographic verification.
    #[error("the {stage} signature is invalid: {source}")]
    Signature {
        /// Which signature failed.
        stage: SignatureStage,
        /// The verifier's diagnostic.
        #[source]
        source: SignatureError,
    },

    /// The publisher key could not be resolved.
    #[error("the publisher key could not be retrieved: {0}")]
    KeyFetch(#[from] KeyFetchError),
}

/// Errors returned by package verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The package or key file argument is unusable.
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),

    /// The extraction workspace could not be created.
    #[error("failed to create an extraction workspace under {}: {source}", .root.display())]
    Workspace {
        /// The configured workspace root.
        root: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Verification failed.
    #[error("Package '{package}' is invalid: {cause}{}", cleanup_note(.cleanup_failure.as_ref()))]
    PackageInvalid {
        /// File name of the package.
        package: String,
        /// The verification failure.
        #[source]
        cause: Box<PackageError>,
        /// Set when the workspace could not be removed afterwards either.
        cleanup_failure: Option<WorkspaceError>,
    },

    /// Verification succeeded but the workspace could not be removed.
    #[error(transparent)]
    Cleanup(#[from] WorkspaceError),
}

impl VerifyError {
    /// The verification failure, if the package was found invalid.
    #[must_use]
    pub fn package_error(&self) -> Option<&PackageError> {
        match self {
            Self::PackageInvalid { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

fn cleanup_note(failure: Option<&WorkspaceError>) -> String {
    failure.map_or_else(String::new, |e| format!(" (additionally, {e})"))
}
