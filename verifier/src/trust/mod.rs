//! Publisher key resolution and detached-signature verification.
//!
//! # Sub-modules
//!
//! - [`keys`] — Remote public key lookup by publisher identity.
//! - [`signature`] — Ed25519 signed-message verification.

pub mod keys;
pub mod signature;
