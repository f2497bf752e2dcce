//! Verifier configuration.
//!
//! `VerifierConfig` captures the package layout (manifest and payload
//! names), the remote key lookup settings, the root authority key used for
//! trust verification, and where extraction workspaces are created. Values
//! are deserialised from TOML and fall back to the defaults below when
//! omitted.

use crate::trust::keys::IDENTITY_PLACEHOLDER;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root authority key compiled into the verifier.
const EMBEDDED_TRUST_ROOT_KEY: &str = include_str!("../resources/trust_root.pub");

/// Errors arising from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unknown fields.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field has an unusable value.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Settings shared by manifest extraction and package verification.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    /// File name of the manifest inside a package.
    pub manifest_file: String,
    /// File name of the payload archive inside a package.
    pub payload_archive: String,
    /// Directory the payload archive is extracted into.
    pub payload_directory: String,
    /// Key lookup URL; `{identity}` is replaced by the publisher identity.
    pub key_url_template: String,
    /// Shortest key bundle accepted from the lookup service.
    pub key_minimum_length: usize,
    /// Per-request timeout for key lookup, in seconds. Unset means no
    /// timeout.
    pub key_fetch_timeout_secs: Option<u64>,
    /// Root authority public key used to verify trust signatures.
    pub trust_root_key: String,
    /// Directory under which extraction workspaces are created. Unset
    /// means the system temp dir, so each workspace is a direct child of it.
    /// A configured root shared between users must not be writable by
    /// other users.
    pub workspace_root: Option<PathBuf>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            manifest_file: "manifest.json".to_owned(),
            payload_archive: "payload.zip".to_owned(),
            payload_directory: "payload".to_owned(),
            key_url_template: format!(
                "https://keybase.io/_/api/1.0/user/lookup.json?username={IDENTITY_PLACEHOLDER}"
            ),
            key_minimum_length: 44,
            key_fetch_timeout_secs: None,
            trust_root_key: EMBEDDED_TRUST_ROOT_KEY.trim().to_owned(),
            workspace_root: None,
        }
    }
}

impl VerifierConfig {
    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown fields
    /// and [`ConfigError::Invalid`] for unusable values.
    ///
    /// # Examples
    ///
    /// ```
    /// use parcel_verifier::config::VerifierConfig;
    ///
    /// let config = VerifierConfig::from_toml_str("manifest_file = \"meta.json\"\n")
    ///     .expect("valid configuration");
    /// assert_eq!(config.manifest_file, "meta.json");
    /// assert_eq!(config.payload_archive, "payload.zip");
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// as [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_file_name("manifest_file", &self.manifest_file)?;
        validate_file_name("payload_archive", &self.payload_archive)?;
        validate_file_name("payload_directory", &self.payload_directory)?;
        if !self.key_url_template.contains(IDENTITY_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                field: "key_url_template",
                reason: format!("must contain the {IDENTITY_PLACEHOLDER} placeholder"),
            });
        }
        if self.trust_root_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "trust_root_key",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }

    /// The key lookup timeout, if one is configured.
    #[must_use]
    pub fn key_fetch_timeout(&self) -> Option<Duration> {
        self.key_fetch_timeout_secs.map(Duration::from_secs)
    }

    /// The directory under which extraction workspaces are created.
    #[must_use]
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Names inside a package must be single, non-blank path components.
fn validate_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be blank".to_owned(),
        });
    }
    if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("\"{value}\" must be a plain file name"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::signature::parse_public_key;
    use rstest::rstest;

    #[rstest]
    fn defaults_describe_the_standard_layout() {
        let config = VerifierConfig::default();

        assert_eq!(config.manifest_file, "manifest.json");
        assert_eq!(config.payload_archive, "payload.zip");
        assert_eq!(config.payload_directory, "payload");
        assert_eq!(config.key_minimum_length, 44);
        assert!(config.key_fetch_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn embedded_trust_root_is_a_valid_key() {
        let config = VerifierConfig::default();
        assert!(parse_public_key(&config.trust_root_key).is_ok());
    }

    #[rstest]
    fn deserialises_overrides_from_toml() {
        let source = concat!(
            "payload_archive = \"content.zip\"\n",
            "key_fetch_timeout_secs = 15\n",
            "workspace_root = \"/var/tmp/parcel\"\n",
        );

        let config = VerifierConfig::from_toml_str(source)
            .expect("expected configuration to parse successfully");

        assert_eq!(config.payload_archive, "content.zip");
        assert_eq!(config.key_fetch_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.workspace_root(), PathBuf::from("/var/tmp/parcel"));
        assert_eq!(config.manifest_file, "manifest.json");
    }

    #[rstest]
    fn rejects_unknown_fields() {
        let outcome = VerifierConfig::from_toml_str("unexpected = true\n");
        assert!(matches!(outcome, Err(ConfigError::Parse(_))));
    }

    #[rstest]
    fn propagates_type_errors() {
        let outcome = VerifierConfig::from_toml_str("key_minimum_length = \"long\"\n");
        assert!(matches!(outcome, Err(ConfigError::Parse(_))));
    }

    #[rstest]
    #[case::blank_manifest("manifest_file = \"  \"\n", "manifest_file")]
    #[case::nested_payload("payload_archive = \"dir/payload.zip\"\n", "payload_archive")]
    #[case::parent_directory("payload_directory = \"..\"\n", "payload_directory")]
    #[case::no_placeholder(
        "key_url_template = \"https://keys.example.test/\"\n",
        "key_url_template"
    )]
    #[case::empty_root("trust_root_key = \"\"\n", "trust_root_key")]
    fn rejects_unusable_values(#[case] source: &str, #[case] expected_field: &str) {
        match VerifierConfig::from_toml_str(source) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected Invalid for {expected_field}, got {other:?}"),
        }
    }

    #[rstest]
    fn default_workspace_root_is_the_temp_dir() {
        let root = VerifierConfig::default().workspace_root();
        assert_eq!(root, std::env::temp_dir());
    }

    #[rstest]
    fn load_reports_missing_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let outcome = VerifierConfig::load(&temp.path().join("absent.toml"));
        assert!(matches!(outcome, Err(ConfigError::Read { .. })));
    }
}
