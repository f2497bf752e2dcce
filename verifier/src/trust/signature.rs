//! Signed-message verification.
//!
//! A signed blob is the standard base64 encoding of a 64-byte Ed25519
//! signature followed by the signed content. Verifying a blob yields the
//! content. Public keys are the base64 encoding of the 32-byte verifying
//! key, optionally wrapped in `-----BEGIN ...-----` armor lines.
//!
//! Error messages describe lengths and the primitive's diagnostic but never
//! include key bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, VerifyingKey};
use sha2::{Digest, Sha256};

/// Errors arising from signature verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The public key could not be decoded.
    #[error("malformed public key: {reason}")]
    MalformedKey {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The signed blob could not be decoded.
    #[error("malformed signed message: {reason}")]
    MalformedSignature {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The signature does not verify against the key.
    #[error("signature rejected: {reason}")]
    Rejected {
        /// Diagnostic from the verification primitive.
        reason: String,
    },
}

/// Verifies signed blobs and recovers their content.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier {
    /// Verify `signed_blob` against `public_key` and return the signed
    /// content.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the key or blob is malformed or the
    /// signature is not valid.
    fn verify(&self, signed_blob: &str, public_key: &str) -> Result<Vec<u8>, SignatureError>;
}

/// Ed25519 implementation of [`SignatureVerifier`].
///
/// # Examples
///
/// ```
/// use parcel_verifier::trust::signature::{Ed25519Verifier, SignatureVerifier};
///
/// let result = Ed25519Verifier.verify("bm90IHNpZ25lZA==", "not a key");
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signed_blob: &str, public_key: &str) -> Result<Vec<u8>, SignatureError> {
        let key = parse_public_key(public_key)?;
        let blob = STANDARD
            .decode(signed_blob.trim())
            .map_err(|e| SignatureError::MalformedSignature {
                reason: format!("not valid base64: {e}"),
            })?;
        let (signature_bytes, content) = blob.split_at_checked(SIGNATURE_LENGTH).ok_or_else(|| {
            SignatureError::MalformedSignature {
                reason: format!(
                    "expected at least {SIGNATURE_LENGTH} bytes, found {}",
                    blob.len()
                ),
            }
        })?;
        let signature = Signature::from_slice(signature_bytes).map_err(|e| {
            SignatureError::MalformedSignature {
                reason: e.to_string(),
            }
        })?;
        key.verify_strict(content, &signature).map_err(|e| SignatureError::Rejected {
            reason: e.to_string(),
        })?;
        Ok(content.to_vec())
    }
}

/// Decode a public key, ignoring armor lines and surrounding whitespace.
///
/// # Errors
///
/// Returns [`SignatureError::MalformedKey`] if the key is not base64, has
/// the wrong length, or is not a valid curve point.
pub fn parse_public_key(text: &str) -> Result<VerifyingKey, SignatureError> {
    let encoded: String = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();
    // The decoder's diagnostic quotes offending bytes, so it is not echoed.
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| SignatureError::MalformedKey {
            reason: "key is not valid base64".to_owned(),
        })?;
    let key_bytes: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignatureError::MalformedKey {
                reason: format!("expected {PUBLIC_KEY_LENGTH} key bytes, found {}", bytes.len()),
            })?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|e| SignatureError::MalformedKey {
        reason: e.to_string(),
    })
}

/// SHA-256 fingerprint of a public key's text, for log messages.
#[must_use]
pub fn key_fingerprint(public_key: &str) -> String {
    let digest = Sha256::digest(public_key.trim().as_bytes());
    format!("{digest:x}")
}
