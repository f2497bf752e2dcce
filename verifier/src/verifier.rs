//! Full package verification.
//!
//! Verification runs through these stages, stopping at the first failure:
//!
//! 1. Validate the package and optional key file arguments.
//! 2. Extract the package into a fresh [`ExtractionWorkspace`].
//! 3. Require the manifest and payload archive, extract the payload, and
//!    require at least one payload file.
//! 4. Decode the manifest.
//! 5. If the manifest is trusted, verify the trust signature against the
//!    root authority key and require it to endorse the manifest's digest.
//! 6. If the manifest has a digest, resolve the publisher key (local file
//!    first, then remote lookup), verify the digest signature, and require
//!    it to reproduce the canonical manifest with signature fields cleared.
//!
//! The workspace is released on every path before the outcome is returned.
//! Failures after step 1 are wrapped in [`VerifyError::PackageInvalid`].

use crate::config::VerifierConfig;
use crate::error::{PackageError, SignatureStage, StructuralError, VerifyError};
use crate::observer::{NoopObserver, Notifier, PackagingObserver, PackagingOperation};
use crate::package::codec::{decode_manifest_bytes, digest_content};
use crate::package::container::PackageContainer;
use crate::package::manifest::Manifest;
use crate::package::workspace::{ExtractionWorkspace, WorkspaceError};
use crate::package::{display_name, validate_readable_file};
use crate::trust::keys::{HttpKeyResolver, KeyResolver};
use crate::trust::signature::{Ed25519Verifier, SignatureVerifier, key_fingerprint};
use log::{debug, warn};
use std::path::Path;

/// The replaceable parts of verification.
pub struct Collaborators<'a> {
    /// Resolves publisher keys when no local key file is given.
    pub key_resolver: &'a dyn KeyResolver,
    /// Verifies trust and digest signatures.
    pub signature_verifier: &'a dyn SignatureVerifier,
    /// Receives progress notifications.
    pub observer: &'a dyn PackagingObserver,
}

/// Verify `package` with the default configuration, remote key lookup,
/// and Ed25519 signatures.
///
/// When `public_key` is given, the publisher key is read from that file
/// instead of being looked up.
///
/// # Errors
///
/// See [`verify_package_with`].
pub fn verify_package(package: &Path, public_key: Option<&Path>) -> Result<(), VerifyError> {
    let config = VerifierConfig::default();
    let resolver = HttpKeyResolver::from_config(&config);
    let collaborators = Collaborators {
        key_resolver: &resolver,
        signature_verifier: &Ed25519Verifier,
        observer: &NoopObserver,
    };
    verify_package_with(package, public_key, &config, &collaborators)
}

/// Verify `package` using the supplied configuration and collaborators.
///
/// # Errors
///
/// Returns [`VerifyError::InvalidArgument`] if `package` or `public_key` is
/// not a readable file, [`VerifyError::Workspace`] if no workspace can be
/// created, [`VerifyError::PackageInvalid`] if any check fails, and
/// [`VerifyError::Cleanup`] if every check passed but the workspace could
/// not be deleted.
pub fn verify_package_with(
    package: &Path,
    public_key: Option<&Path>,
    config: &VerifierConfig,
    collaborators: &Collaborators<'_>,
) -> Result<(), VerifyError> {
    validate_readable_file(package)?;
    if let Some(key_path) = public_key {
        validate_readable_file(key_path)?;
    }

    let name = display_name(package);
    let notifier = Notifier::new(PackagingOperation::VerifyPackage, collaborators.observer);
    notifier.info(format!("Verifying package '{name}'..."));

    let root = config.workspace_root();
    let workspace = ExtractionWorkspace::create(&root)
        .map_err(|source| VerifyError::Workspace { root, source })?;

    let verification = Verification {
        package,
        public_key,
        config,
        collaborators,
        notifier: &notifier,
    };
    let outcome = verification.run(&workspace);

    notifier.verbose("Deleting temporary files...");
    let released = workspace.release();
    if let Err(e) = &released {
        warn!("{e}");
    }

    if released.is_ok() && outcome.is_ok() {
        notifier.success("Package verified successfully.");
    }
    conclude(name, outcome, released)
}

/// Combine the verification outcome with the workspace release result.
fn conclude(
    package: String,
    outcome: Result<(), PackageError>,
    released: Result<(), WorkspaceError>,
) -> Result<(), VerifyError> {
    match (outcome, released) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(cleanup)) => Err(VerifyError::Cleanup(cleanup)),
        (Err(cause), released) => {
            debug!("package '{package}' failed verification: {cause}");
            Err(VerifyError::PackageInvalid {
                package,
                cause: Box::new(cause),
                cleanup_failure: released.err(),
            })
        }
    }
}

/// One verification attempt over an existing workspace.
struct Verification<'a> {
    package: &'a Path,
    public_key: Option<&'a Path>,
    config: &'a VerifierConfig,
    collaborators: &'a Collaborators<'a>,
    notifier: &'a Notifier<'a>,
}

impl Verification<'_> {
    fn run(&self, workspace: &ExtractionWorkspace) -> Result<(), PackageError> {
        self.extract(workspace)?;
        self.check_structure(workspace)?;

        let manifest_path = workspace.join(&self.config.manifest_file);
        self.notifier
            .verbose(format!("Reading manifest from '{}'...", manifest_path.display()));
        let contents = std::fs::read(&manifest_path).map_err(|source| PackageError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest = decode_manifest_bytes(&contents)?;

        let signature = manifest.signature();
        if signature.has_trust() {
            self.check_trust(&manifest)?;
        }
        if signature.has_digest() {
            self.check_digest(&manifest)?;
        } else {
            warn!(
                "manifest for '{}' is unsigned and carries no authenticity guarantee",
                display_name(self.package)
            );
        }
        // Payload file contents are not validated.
        Ok(())
    }

    fn extract(&self, workspace: &ExtractionWorkspace) -> Result<(), PackageError> {
        self.notifier.verbose(format!(
            "Extracting package to temporary directory '{}'...",
            workspace.path().display()
        ));
        let files = PackageContainer::open(self.package)?.extract_all(workspace.path())?;
        debug!("extracted {} entries from {}", files.len(), self.package.display());
        Ok(())
    }

    fn check_structure(&self, workspace: &ExtractionWorkspace) -> Result<(), PackageError> {
        self.notifier.verbose("Checking extracted files...");
        if !workspace.join(&self.config.manifest_file).is_file() {
            return Err(StructuralError::MissingManifest.into());
        }
        let archive = workspace.join(&self.config.payload_archive);
        if !archive.is_file() {
            return Err(StructuralError::MissingPayloadArchive.into());
        }

        self.notifier.verbose("Extracting payload archive...");
        let length = std::fs::metadata(&archive)
            .map_err(|source| PackageError::Io {
                path: archive.clone(),
                source,
            })?
            .len();
        if length == 0 {
            return Err(StructuralError::EmptyPayload.into());
        }
        let payload_dir = workspace.join(&self.config.payload_directory);
        let files = PackageContainer::open(&archive)?.extract_all(&payload_dir)?;
        if files.is_empty() {
            return Err(StructuralError::EmptyPayload.into());
        }
        debug!("payload contains {} files", files.len());
        Ok(())
    }

    fn check_trust(&self, manifest: &Manifest) -> Result<(), PackageError> {
        self.notifier.verbose("Verifying the manifest trust...");
        let signature = manifest.signature();
        if !signature.has_digest() {
            return Err(StructuralError::TrustWithoutDigest.into());
        }
        debug!(
            "verifying trust against root key {}",
            key_fingerprint(&self.config.trust_root_key)
        );
        let endorsed = self.verify(
            SignatureStage::Trust,
            signature.trust(),
            &self.config.trust_root_key,
        )?;
        if endorsed != signature.digest().as_bytes() {
            return Err(PackageError::TrustInvalid);
        }
        self.notifier.verbose("Trust verified successfully.");
        Ok(())
    }

    fn check_digest(&self, manifest: &Manifest) -> Result<(), PackageError> {
        self.notifier.verbose("Verifying the manifest digest...");
        let signature = manifest.signature();
        let public_key = self.resolve_key(signature.subject())?;
        let signed = self.verify(SignatureStage::Digest, signature.digest(), &public_key)?;
        if signed != digest_content(manifest)?.as_bytes() {
            return Err(PackageError::DigestInvalid);
        }
        self.notifier.verbose("Digest verified successfully.");
        Ok(())
    }

    fn resolve_key(&self, subject: &str) -> Result<String, PackageError> {
        let key = match self.public_key {
            Some(path) => {
                self.notifier
                    .verbose(format!("Reading public key from '{}'...", path.display()));
                std::fs::read_to_string(path).map_err(|source| PackageError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => {
                self.notifier
                    .verbose(format!("Fetching public key for '{subject}'..."));
                self.collaborators
                    .key_resolver
                    .fetch_key_for_identity(subject)?
            }
        };
        debug!("using publisher key {}", key_fingerprint(&key));
        Ok(key)
    }

    fn verify(
        &self,
        stage: SignatureStage,
        signed_blob: &str,
        public_key: &str,
    ) -> Result<Vec<u8>, PackageError> {
        self.collaborators
            .signature_verifier
            .verify(signed_blob, public_key)
            .map_err(|source| PackageError::Signature { stage, source })
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
