//! Manifest schema types for parcel packages.
//!
//! A manifest carries arbitrary publisher-defined metadata plus a
//! `signature` block:
//!
//! ```json
//! {
//!   "title": "Example",
//!   "version": "1.0.0",
//!   "signature": {
//!     "subject": "alice",
//!     "digest": "",
//!     "trust": ""
//!   }
//! }
//! ```
//!
//! `digest` is the publisher's signature over the canonical manifest with
//! `digest` and `trust` cleared; `trust` is the root authority's signature
//! over `digest`. Empty strings mean "absent".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The top-level key holding the signature block.
pub const SIGNATURE_KEY: &str = "signature";

/// Errors arising from building a manifest in code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// A metadata key collides with the signature block.
    #[error("metadata key \"{key}\" is reserved for the signature block")]
    ReservedKey {
        /// The rejected key.
        key: String,
    },
}

/// The signature block of a manifest.
///
/// # Examples
///
/// ```
/// use parcel_verifier::package::manifest::ManifestSignature;
///
/// let signature = ManifestSignature::new("alice");
/// assert_eq!(signature.subject(), "alice");
/// assert!(!signature.has_digest());
/// assert!(!signature.has_trust());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSignature {
    subject: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    digest: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    trust: String,
}

impl ManifestSignature {
    /// Create an unsigned block for the given publisher identity.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            digest: String::new(),
            trust: String::new(),
        }
    }

    /// Set the digest signature.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }

    /// Set the trust signature.
    #[must_use]
    pub fn with_trust(mut self, trust: impl Into<String>) -> Self {
        self.trust = trust.into();
        self
    }

    /// The publisher identity.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The digest signature, empty when absent.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The trust signature, empty when absent.
    #[must_use]
    pub fn trust(&self) -> &str {
        &self.trust
    }

    /// Whether a digest signature is present.
    #[must_use]
    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }

    /// Whether a trust signature is present.
    #[must_use]
    pub fn has_trust(&self) -> bool {
        !self.trust.is_empty()
    }

    /// Return a copy with `digest` and `trust` cleared.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self::new(self.subject.clone())
    }
}

/// A package manifest: publisher metadata plus a signature block.
///
/// Metadata is kept in a sorted map so that encoding is deterministic.
///
/// # Examples
///
/// ```
/// use parcel_verifier::package::manifest::Manifest;
/// use serde_json::json;
///
/// let manifest = Manifest::new("alice")
///     .with_metadata("title", json!("Example"))
///     .expect("title is not reserved");
/// assert_eq!(manifest.signature().subject(), "alice");
/// assert_eq!(manifest.metadata_value("title"), Some(&json!("Example")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    metadata: BTreeMap<String, Value>,
    signature: ManifestSignature,
}

impl Manifest {
    /// Create a manifest with no metadata and an unsigned block for
    /// `subject`.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            signature: ManifestSignature::new(subject),
        }
    }

    /// Add or replace a metadata field.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::ReservedKey`] if `key` is `signature`.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<Self, ManifestError> {
        let key = key.into();
        if key == SIGNATURE_KEY {
            return Err(ManifestError::ReservedKey { key });
        }
        self.metadata.insert(key, value);
        Ok(self)
    }

    /// Replace the signature block.
    #[must_use]
    pub fn with_signature(mut self, signature: ManifestSignature) -> Self {
        self.signature = signature;
        self
    }

    /// All metadata fields in key order.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Look up a single metadata field.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// The signature block.
    #[must_use]
    pub fn signature(&self) -> &ManifestSignature {
        &self.signature
    }

    /// Return a copy whose signature block has `digest` and `trust` cleared.
    ///
    /// This is the manifest a publisher signs.
    #[must_use]
    pub fn with_signature_fields_cleared(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            signature: self.signature.cleared(),
        }
    }
}

/// Accept `null` for optional signature strings and treat it as empty.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
