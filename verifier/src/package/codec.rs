//! Canonical manifest encoding.
//!
//! The canonical form is pretty-printed JSON with metadata keys in sorted
//! order followed by the signature block. Digest signatures are computed
//! over this exact text, so encoding must be byte-for-byte deterministic.

use super::manifest::Manifest;

/// Errors arising from manifest encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ManifestParseError {
    /// JSON deserialization or schema validation failed.
    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The manifest bytes are not valid UTF-8.
    #[error("manifest is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// JSON serialization failed.
    #[error("manifest encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Parse manifest text.
///
/// # Errors
///
/// Returns [`ManifestParseError::Json`] if the text is not JSON, is not an
/// object, or lacks a valid `signature` block with a `subject`.
///
/// # Examples
///
/// ```
/// use parcel_verifier::package::codec::decode_manifest;
///
/// let json = r#"{"title":"Example","signature":{"subject":"alice","digest":"","trust":""}}"#;
/// let manifest = decode_manifest(json).expect("valid manifest");
/// assert_eq!(manifest.signature().subject(), "alice");
/// ```
pub fn decode_manifest(text: &str) -> Result<Manifest, ManifestParseError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse manifest bytes as read from a package.
///
/// # Errors
///
/// Returns [`ManifestParseError::Utf8`] if `bytes` is not UTF-8, otherwise
/// as [`decode_manifest`].
pub fn decode_manifest_bytes(bytes: &[u8]) -> Result<Manifest, ManifestParseError> {
    decode_manifest(std::str::from_utf8(bytes)?)
}

/// Encode a manifest in canonical form.
///
/// # Errors
///
/// Returns [`ManifestParseError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```
/// use parcel_verifier::package::codec::{decode_manifest, encode_manifest};
/// use parcel_verifier::package::manifest::Manifest;
///
/// let manifest = Manifest::new("alice");
/// let text = encode_manifest(&manifest).expect("encodes");
/// assert_eq!(decode_manifest(&text).expect("decodes"), manifest);
/// ```
pub fn encode_manifest(manifest: &Manifest) -> Result<String, ManifestParseError> {
    serde_json::to_string_pretty(manifest).map_err(ManifestParseError::Encode)
}

/// Return a copy of `manifest` with `digest` and `trust` cleared.
#[must_use]
pub fn clear_signature_fields(manifest: &Manifest) -> Manifest {
    manifest.with_signature_fields_cleared()
}

/// The exact text a publisher's digest signature must reproduce: the
/// canonical encoding of the manifest with signature fields cleared.
///
/// # Errors
///
/// Returns [`ManifestParseError::Encode`] if serialization fails.
pub fn digest_content(manifest: &Manifest) -> Result<String, ManifestParseError> {
    encode_manifest(&clear_signature_fields(manifest))
}
