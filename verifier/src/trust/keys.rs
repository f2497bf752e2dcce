//! Publisher public key lookup.
//!
//! Keys are resolved by substituting the publisher identity into a
//! configured URL template, fetching the URL, and reading the key bundle at
//! `them.public_keys.primary.bundle` in the JSON response. Keys are fetched
//! on every call; nothing is cached.

use crate::config::VerifierConfig;
use log::debug;
use std::time::Duration;

/// Placeholder replaced by the publisher identity in the URL template.
pub const IDENTITY_PLACEHOLDER: &str = "{identity}";

/// JSON pointer to the key bundle in a lookup response.
pub const KEY_BUNDLE_POINTER: &str = "/them/public_keys/primary/bundle";

/// Resolves the public key for a publisher identity.
#[cfg_attr(test, mockall::automock)]
pub trait KeyResolver {
    /// Fetch the public key published for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFetchError`] if the key cannot be retrieved or is not
    /// plausible.
    fn fetch_key_for_identity(&self, identity: &str) -> Result<String, KeyFetchError>;
}

/// Errors arising from public key lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFetchError {
    /// The identity is empty or contains characters outside the URL
    /// unreserved set.
    #[error("invalid publisher identity \"{identity}\"")]
    InvalidIdentity {
        /// The rejected identity.
        identity: String,
    },

    /// The lookup service has no entry at the URL (HTTP 404).
    #[error("key not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The HTTP request failed.
    #[error("key lookup failed for {url}: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The response body is not JSON.
    #[error("key lookup response from {url} could not be parsed: {reason}")]
    Parse {
        /// The URL that was requested.
        url: String,
        /// The parser diagnostic.
        reason: String,
    },

    /// The response has no key bundle at the expected path.
    #[error("key lookup response from {url} has no primary key bundle")]
    MissingField {
        /// The URL that was requested.
        url: String,
    },

    /// The retrieved key is too short to be a real key.
    #[error(
        "the retrieved key from {url} was not long enough (expected: >= {minimum}, actual: {actual}) to be a valid public key"
    )]
    KeyTooShort {
        /// The URL that was requested.
        url: String,
        /// The minimum accepted length.
        minimum: usize,
        /// The length that was received.
        actual: usize,
    },
}

/// HTTP-based key resolver using `ureq`.
pub struct HttpKeyResolver {
    url_template: String,
    minimum_length: usize,
    agent: ureq::Agent,
}

impl HttpKeyResolver {
    /// Create a resolver. `timeout` bounds each request; `None` leaves
    /// requests unbounded.
    #[must_use]
    pub fn new(
        url_template: impl Into<String>,
        minimum_length: usize,
        timeout: Option<Duration>,
    ) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(timeout).build();
        Self {
            url_template: url_template.into(),
            minimum_length,
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Create a resolver from the verifier configuration.
    #[must_use]
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            config.key_url_template.clone(),
            config.key_minimum_length,
            config.key_fetch_timeout(),
        )
    }

    /// The lookup URL for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyFetchError::InvalidIdentity`] for identities that could
    /// alter the URL.
    pub fn lookup_url(&self, identity: &str) -> Result<String, KeyFetchError> {
        lookup_url(&self.url_template, identity)
    }
}

impl KeyResolver for HttpKeyResolver {
    fn fetch_key_for_identity(&self, identity: &str) -> Result<String, KeyFetchError> {
        let url = self.lookup_url(identity)?;
        debug!("fetching public key information from {url}");
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| KeyFetchError::Http {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        extract_key_bundle(&body, &url, self.minimum_length)
    }
}

/// Substitute `identity` into `template`.
///
/// # Errors
///
/// Returns [`KeyFetchError::InvalidIdentity`] if `identity` is empty or
/// contains characters outside `A-Z a-z 0-9 - . _ ~`.
///
/// # Examples
///
/// ```
/// use parcel_verifier::trust::keys::lookup_url;
///
/// let url = lookup_url("https://keys.example.test/{identity}", "alice").expect("valid");
/// assert_eq!(url, "https://keys.example.test/alice");
/// assert!(lookup_url("https://keys.example.test/{identity}", "a/b").is_err());
/// ```
pub fn lookup_url(template: &str, identity: &str) -> Result<String, KeyFetchError> {
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
    if identity.is_empty() || !identity.chars().all(unreserved) {
        return Err(KeyFetchError::InvalidIdentity {
            identity: identity.to_owned(),
        });
    }
    Ok(template.replace(IDENTITY_PLACEHOLDER, identity))
}

/// Read the key bundle out of a lookup response body.
///
/// # Errors
///
/// Returns [`KeyFetchError::Parse`] for non-JSON bodies,
/// [`KeyFetchError::MissingField`] when the bundle is absent or not a
/// string, and [`KeyFetchError::KeyTooShort`] when it is shorter than
/// `minimum_length`.
pub fn extract_key_bundle(
    body: &str,
    url: &str,
    minimum_length: usize,
) -> Result<String, KeyFetchError> {
    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|e| KeyFetchError::Parse {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
    let key = document
        .pointer(KEY_BUNDLE_POINTER)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| KeyFetchError::MissingField {
            url: url.to_owned(),
        })?
        .trim();
    let actual = key.len();
    if actual < minimum_length {
        return Err(KeyFetchError::KeyTooShort {
            url: url.to_owned(),
            minimum: minimum_length,
            actual,
        });
    }
    debug!("public key fetched from {url}");
    Ok(key.to_owned())
}

/// Map a ureq error to a [`KeyFetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> KeyFetchError {
    match err {
        ureq::Error::StatusCode(404) => KeyFetchError::NotFound {
            url: url.to_owned(),
        },
        other => KeyFetchError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const URL: &str = "https://keys.example.test/lookup?username=alice";
    const KEY: &str = "zpKqK3PhKMP3Dupmdf8ceg0ssxtsgzj7sJTLd+U+4ps=";

    fn response_with_bundle(bundle: &str) -> String {
        serde_json::json!({
            "status": {"code": 0},
            "them": {"public_keys": {"primary": {"bundle": bundle}}}
        })
        .to_string()
    }

    #[test]
    fn substitutes_identity_into_template() {
        let url = lookup_url("https://keys.example.test/lookup?username={identity}", "alice")
            .expect("valid identity");
        assert_eq!(url, URL);
    }

    #[rstest]
    #[case::empty("")]
    #[case::slash("alice/../admin")]
    #[case::query("alice&fields=all")]
    #[case::space("alice smith")]
    fn rejects_identities_that_alter_the_url(#[case] identity: &str) {
        let result = lookup_url("https://keys.example.test/{identity}", identity);
        assert!(matches!(result, Err(KeyFetchError::InvalidIdentity { .. })));
    }

    #[test]
    fn extracts_primary_bundle() {
        let key = extract_key_bundle(&response_with_bundle(KEY), URL, 44).expect("key");
        assert_eq!(key, KEY);
    }

    #[test]
    fn rejects_unparseable_body() {
        let result = extract_key_bundle("<html>Server error</html>", URL, 44);
        assert!(matches!(result, Err(KeyFetchError::Parse { .. })));
    }

    #[rstest]
    #[case::no_them(r#"{"status":{"code":205}}"#)]
    #[case::no_primary(r#"{"them":{"public_keys":{}}}"#)]
    #[case::bundle_not_string(r#"{"them":{"public_keys":{"primary":{"bundle":42}}}}"#)]
    fn rejects_missing_bundle(#[case] body: &str) {
        let result = extract_key_bundle(body, URL, 44);
        assert!(matches!(result, Err(KeyFetchError::MissingField { .. })));
    }

    #[test]
    fn rejects_implausibly_short_key() {
        let result = extract_key_bundle(&response_with_bundle("not found"), URL, 44);
        assert_eq!(
            result,
            Err(KeyFetchError::KeyTooShort {
                url: URL.to_owned(),
                minimum: 44,
                actual: 9,
            })
        );
    }

    #[test]
    fn padding_does_not_count_towards_key_length() {
        let padded = format!("\n   {}   \n", "k".repeat(40));
        let result = extract_key_bundle(&response_with_bundle(&padded), URL, 44);
        assert!(matches!(
            result,
            Err(KeyFetchError::KeyTooShort { actual: 40, .. })
        ));
    }

    #[test]
    fn returns_key_without_surrounding_whitespace() {
        let padded = format!("  {KEY}\n");
        let key = extract_key_bundle(&response_with_bundle(&padded), URL, 44).expect("key");
        assert_eq!(key, KEY);
    }

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let mapped = map_ureq_error(URL, &ureq::Error::StatusCode(404));
        assert!(matches!(mapped, KeyFetchError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let mapped = map_ureq_error(URL, &ureq::Error::StatusCode(500));
        assert!(matches!(mapped, KeyFetchError::Http { .. }));
    }

    #[test]
    fn resolver_builds_url_from_config() {
        let config = VerifierConfig {
            key_url_template: "https://keys.example.test/{identity}.json".to_owned(),
            ..VerifierConfig::default()
        };
        let resolver = HttpKeyResolver::from_config(&config);
        assert_eq!(
            resolver.lookup_url("bob").expect("valid"),
            "https://keys.example.test/bob.json"
        );
    }
}
