//! Parcel package verification library.
//!
//! A parcel package is a zip container holding a JSON manifest and a payload
//! archive. This crate extracts manifests from packages and verifies package
//! integrity and authenticity: structural completeness, an optional trust
//! signature from the root authority, and a digest signature from the
//! publisher that binds the whole manifest.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions for `parcel-verify`
//! - [`config`] - Verifier configuration loaded from TOML
//! - [`error`] - Verification error taxonomy
//! - [`extractor`] - Manifest extraction from packages
//! - [`observer`] - Progress notifications for packaging operations
//! - [`package`] - Package container, manifest codec, and extraction workspace
//! - [`trust`] - Publisher key resolution and signature verification
//! - [`verifier`] - Full package verification

pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod observer;
pub mod package;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod trust;
pub mod verifier;

pub use extractor::{extract_manifest, extract_manifest_with};
pub use verifier::{Collaborators, verify_package, verify_package_with};
