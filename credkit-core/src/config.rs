//! Bridge configuration.

use serde::{Deserialize, Serialize};

use crate::credential::AppleScope;
use crate::error::{CredentialError, CredentialResult};

/// Static configuration applied when a bridge is created.
///
/// Hosts usually ship this as JSON next to their associated domains entitlement:
///
/// ```json
/// { "relyingPartyIdentifier": "example.com", "preferImmediatelyAvailableCredentials": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Domain passkeys are issued for and verified against.
    pub relying_party_identifier: String,
    /// Default for ceremonies that do not specify it.
    #[serde(default)]
    pub prefer_immediately_available_credentials: bool,
    /// Scopes requested by Sign in with Apple when the caller does not specify any.
    #[serde(default = "default_apple_scopes")]
    pub apple_requested_scopes: Vec<AppleScope>,
}

fn default_apple_scopes() -> Vec<AppleScope> {
    vec![AppleScope::FullName, AppleScope::Email]
}

impl BridgeConfig {
    /// Configuration for `relying_party_identifier` with all defaults.
    #[must_use]
    pub fn new(relying_party_identifier: impl Into<String>) -> Self {
        Self {
            relying_party_identifier: relying_party_identifier.into(),
            prefer_immediately_available_credentials: false,
            apple_requested_scopes: default_apple_scopes(),
        }
    }

    /// Loads and validates configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` for malformed JSON and `InvalidInput` for an
    /// invalid relying party identifier.
    pub fn from_json(json: &str) -> CredentialResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        validate_relying_party_identifier(&config.relying_party_identifier)?;
        Ok(config)
    }
}

/// Parses a [`BridgeConfig`] from JSON.
///
/// # Errors
///
/// See [`BridgeConfig::from_json`].
#[uniffi::export]
pub fn bridge_config_from_json(json: &str) -> CredentialResult<BridgeConfig> {
    BridgeConfig::from_json(json)
}

/// Checks that `identifier` is a bare domain: no scheme, port, path or whitespace.
pub(crate) fn validate_relying_party_identifier(identifier: &str) -> CredentialResult<()> {
    let invalid = |reason: &str| {
        Err(CredentialError::invalid_input(
            "relying_party_identifier",
            reason,
        ))
    };

    if identifier.is_empty() {
        return invalid("must not be empty");
    }
    if identifier.chars().any(char::is_whitespace) {
        return invalid("must not contain whitespace");
    }
    if identifier.contains([':', '/', '?', '#']) {
        return invalid("must be a bare domain without scheme, port or path");
    }
    if identifier.starts_with('.') || identifier.ends_with('.') {
        return invalid("must not start or end with a dot");
    }
    Ok(())
}
