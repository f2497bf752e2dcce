//! Shared test utilities for the verifier crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use crate::observer::{PackagingObserver, PackagingUpdate};
use crate::package::codec::{ManifestParseError, digest_content, encode_manifest};
use crate::package::manifest::{Manifest, ManifestSignature};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{Signer, SigningKey};
use std::cell::RefCell;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Write a zip archive at `path` holding `entries` as `(name, contents)`.
/// Names ending in `/` become directory entries.
///
/// # Errors
///
/// Returns [`ZipError`] if the file cannot be created or written.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<(), ZipError> {
    let file = File::create(path)?;
    write_entries(
        file,
        entries.iter().map(|(name, contents)| (*name, contents.as_bytes())),
    )?;
    Ok(())
}

fn write_entries<'a, W: Write + std::io::Seek>(
    writer: W,
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> Result<W, ZipError> {
    let mut zip = ZipWriter::new(writer);
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(name, SimpleFileOptions::default())?;
        } else {
            zip.start_file(name, SimpleFileOptions::default())?;
            zip.write_all(contents)?;
        }
    }
    zip.finish()
}

/// Assembles package files for tests.
///
/// The default package holds an unsigned manifest for subject `alice` and a
/// payload archive with one file.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    manifest_file: String,
    payload_archive: String,
    manifest: Option<Vec<u8>>,
    payload: Option<Vec<(String, String)>>,
    extra: Vec<(String, String)>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        let manifest = encode_manifest(&Manifest::new("alice"))
            .ok()
            .map(String::into_bytes);
        Self {
            manifest_file: "manifest.json".to_owned(),
            payload_archive: "payload.zip".to_owned(),
            manifest,
            payload: Some(vec![("app.bin".to_owned(), "binary payload".to_owned())]),
            extra: Vec::new(),
        }
    }
}

impl PackageBuilder {
    /// Start from the default package.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `manifest`, encoded canonically.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestParseError`] if the manifest cannot be encoded.
    pub fn manifest(mut self, manifest: &Manifest) -> Result<Self, ManifestParseError> {
        self.manifest = Some(encode_manifest(manifest)?.into_bytes());
        Ok(self)
    }

    /// Use `contents` verbatim as the manifest entry.
    #[must_use]
    pub fn raw_manifest(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.manifest = Some(contents.into());
        self
    }

    /// Omit the manifest entry.
    #[must_use]
    pub fn without_manifest(mut self) -> Self {
        self.manifest = None;
        self
    }

    /// Add a file to the payload archive.
    #[must_use]
    pub fn payload_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.payload
            .get_or_insert_with(Vec::new)
            .push((name.into(), contents.into()));
        self
    }

    /// Make the payload archive contain no entries.
    #[must_use]
    pub fn empty_payload(mut self) -> Self {
        self.payload = Some(Vec::new());
        self
    }

    /// Omit the payload archive entry.
    #[must_use]
    pub fn without_payload(mut self) -> Self {
        self.payload = None;
        self
    }

    /// Add an unrelated entry to the outer container.
    #[must_use]
    pub fn entry(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.extra.push((name.into(), contents.into()));
        self
    }

    /// Use different manifest and payload archive entry names.
    #[must_use]
    pub fn entry_names(mut self, manifest_file: &str, payload_archive: &str) -> Self {
        manifest_file.clone_into(&mut self.manifest_file);
        payload_archive.clone_into(&mut self.payload_archive);
        self
    }

    /// Write the package to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ZipError`] if either archive cannot be written.
    pub fn build(&self, path: &Path) -> Result<(), ZipError> {
        let payload_bytes = match &self.payload {
            Some(files) => {
                let cursor = write_entries(
                    Cursor::new(Vec::new()),
                    files
                        .iter()
                        .map(|(name, contents)| (name.as_str(), contents.as_bytes())),
                )?;
                Some(cursor.into_inner())
            }
            None => None,
        };

        let mut entries: Vec<(&str, &[u8])> = Vec::new();
        if let Some(manifest) = &self.manifest {
            entries.push((self.manifest_file.as_str(), manifest.as_slice()));
        }
        if let Some(bytes) = &payload_bytes {
            entries.push((self.payload_archive.as_str(), bytes.as_slice()));
        }
        entries.extend(
            self.extra
                .iter()
                .map(|(name, contents)| (name.as_str(), contents.as_bytes())),
        );

        write_entries(File::create(path)?, entries)?;
        Ok(())
    }
}

/// A deterministic Ed25519 key pair producing signed blobs in the format
/// the verifier expects.
pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    /// Create a signer from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// The publisher key used throughout the tests.
    #[must_use]
    pub fn publisher() -> Self {
        Self::from_seed([7; 32])
    }

    /// A stand-in root authority key.
    #[must_use]
    pub fn root_authority() -> Self {
        Self::from_seed([9; 32])
    }

    /// The base64 public key.
    #[must_use]
    pub fn public_key(&self) -> String {
        STANDARD.encode(self.key.verifying_key().to_bytes())
    }

    /// Sign `content`, returning base64 of signature followed by content.
    #[must_use]
    pub fn sign(&self, content: &[u8]) -> String {
        let signature = self.key.sign(content);
        let mut blob = signature.to_bytes().to_vec();
        blob.extend_from_slice(content);
        STANDARD.encode(blob)
    }
}

/// Sign `manifest` as `publisher`, optionally endorsed by `root`.
///
/// # Errors
///
/// Returns [`ManifestParseError`] if the manifest cannot be encoded.
pub fn sign_manifest(
    manifest: &Manifest,
    publisher: &TestSigner,
    root: Option<&TestSigner>,
) -> Result<Manifest, ManifestParseError> {
    let digest = publisher.sign(digest_content(manifest)?.as_bytes());
    let mut signature =
        ManifestSignature::new(manifest.signature().subject()).with_digest(digest.clone());
    if let Some(root) = root {
        signature = signature.with_trust(root.sign(digest.as_bytes()));
    }
    Ok(manifest.clone().with_signature(signature))
}

/// Records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    updates: RefCell<Vec<PackagingUpdate>>,
}

impl RecordingObserver {
    /// All recorded notifications, oldest first.
    #[must_use]
    pub fn updates(&self) -> Vec<PackagingUpdate> {
        self.updates.borrow().clone()
    }

    /// The recorded messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.updates
            .borrow()
            .iter()
            .map(|update| update.message.clone())
            .collect()
    }
}

impl PackagingObserver for RecordingObserver {
    fn on_update(&self, update: &PackagingUpdate) {
        self.updates.borrow_mut().push(update.clone());
    }
}
