//! WebAuthn JSON as exchanged with the application and its relying party.
//!
//! Inputs are the `PublicKeyCredentialCreationOptionsJSON` and
//! `PublicKeyCredentialRequestOptionsJSON` shapes; outputs are `RegistrationResponseJSON`
//! and `AuthenticationResponseJSON`. Binary fields are base64url.

use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, CredentialResult};
use crate::passkey::{PasskeyAssertion, PasskeyRegistration, UserIdentity, UserVerification};

const PUBLIC_KEY_TYPE: &str = "public-key";
const PLATFORM_ATTACHMENT: &str = "platform";
const MAX_USER_ID_LEN: usize = 64;

/// Parsed `PublicKeyCredentialCreationOptionsJSON`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationOptions {
    /// Server issued challenge.
    pub challenge: Vec<u8>,
    /// `rp.id`, when present.
    pub relying_party_id: Option<String>,
    /// `rp.name`, when present.
    pub relying_party_name: Option<String>,
    /// The account the passkey is created for.
    pub user: UserIdentity,
    /// `excludeCredentials[].id`
    pub excluded_credentials: Vec<Vec<u8>>,
    /// `authenticatorSelection.userVerification`
    pub user_verification: UserVerification,
}

/// Parsed `PublicKeyCredentialRequestOptionsJSON`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Server issued challenge.
    pub challenge: Vec<u8>,
    /// `rpId`, when present.
    pub relying_party_id: Option<String>,
    /// `allowCredentials[].id`
    pub allowed_credentials: Vec<Vec<u8>>,
    /// `userVerification`
    pub user_verification: UserVerification,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreationOptionsJson {
    challenge: String,
    #[serde(default)]
    rp: Option<RelyingPartyJson>,
    user: UserJson,
    #[serde(default)]
    exclude_credentials: Vec<CredentialDescriptorJson>,
    #[serde(default)]
    authenticator_selection: Option<AuthenticatorSelectionJson>,
}

#[derive(Deserialize)]
struct RelyingPartyJson {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJson {
    id: String,
    name: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticatorSelectionJson {
    #[serde(default)]
    user_verification: Option<String>,
}

#[derive(Deserialize)]
struct CredentialDescriptorJson {
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestOptionsJson {
    challenge: String,
    #[serde(default)]
    rp_id: Option<String>,
    #[serde(default)]
    allow_credentials: Vec<CredentialDescriptorJson>,
    #[serde(default)]
    user_verification: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyCredentialJson<R> {
    id: String,
    raw_id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    authenticator_attachment: &'static str,
    response: R,
    client_extension_results: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttestationResponseJson {
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
    attestation_object: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssertionResponseJson {
    #[serde(rename = "clientDataJSON")]
    client_data_json: String,
    authenticator_data: String,
    signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_handle: Option<String>,
}

/// Parses creation options JSON for a registration ceremony.
///
/// # Errors
///
/// Returns `SerializationError` for malformed JSON and `InvalidInput` for bad field values.
pub fn parse_creation_options(json: &str) -> CredentialResult<CreationOptions> {
    let raw: CreationOptionsJson = serde_json::from_str(json)?;

    let challenge = decode_challenge(&raw.challenge)?;
    let user_id = decode_field(&raw.user.id, "user.id")?;
    if user_id.is_empty() || user_id.len() > MAX_USER_ID_LEN {
        return Err(CredentialError::invalid_input(
            "user.id",
            format!("must be between 1 and {MAX_USER_ID_LEN} bytes"),
        ));
    }
    if raw.user.name.trim().is_empty() {
        return Err(CredentialError::invalid_input("user.name", "must not be empty"));
    }

    let (relying_party_id, relying_party_name) = raw
        .rp
        .map_or((None, None), |rp| (rp.id, rp.name));
    let display_name = raw
        .user
        .display_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| raw.user.name.clone());

    Ok(CreationOptions {
        challenge,
        relying_party_id,
        relying_party_name,
        user: UserIdentity {
            id: user_id,
            name: raw.user.name,
            display_name,
        },
        excluded_credentials: decode_descriptors(
            &raw.exclude_credentials,
            "excludeCredentials",
        )?,
        user_verification: user_verification(
            raw.authenticator_selection
                .and_then(|selection| selection.user_verification)
                .as_deref(),
        ),
    })
}

/// Parses request options JSON for an assertion ceremony.
///
/// # Errors
///
/// Returns `SerializationError` for malformed JSON and `InvalidInput` for bad field values.
pub fn parse_request_options(json: &str) -> CredentialResult<RequestOptions> {
    let raw: RequestOptionsJson = serde_json::from_str(json)?;

    Ok(RequestOptions {
        challenge: decode_challenge(&raw.challenge)?,
        relying_party_id: raw.rp_id,
        allowed_credentials: decode_descriptors(&raw.allow_credentials, "allowCredentials")?,
        user_verification: user_verification(raw.user_verification.as_deref()),
    })
}

/// Encodes a new passkey as `RegistrationResponseJSON`.
///
/// # Errors
///
/// Returns `SerializationError` if encoding fails.
pub fn registration_response_json(registration: &PasskeyRegistration) -> CredentialResult<String> {
    let id = URL_SAFE_NO_PAD.encode(&registration.credential_id);
    let credential = PublicKeyCredentialJson {
        raw_id: id.clone(),
        id,
        kind: PUBLIC_KEY_TYPE,
        authenticator_attachment: PLATFORM_ATTACHMENT,
        response: AttestationResponseJson {
            client_data_json: URL_SAFE_NO_PAD.encode(&registration.client_data_json),
            attestation_object: URL_SAFE_NO_PAD.encode(&registration.attestation_object),
        },
        client_extension_results: serde_json::Map::new(),
    };
    Ok(serde_json::to_string(&credential)?)
}

/// Encodes an assertion as `AuthenticationResponseJSON`.
///
/// # Errors
///
/// Returns `SerializationError` if encoding fails.
pub fn authentication_response_json(assertion: &PasskeyAssertion) -> CredentialResult<String> {
    let id = URL_SAFE_NO_PAD.encode(&assertion.credential_id);
    let credential = PublicKeyCredentialJson {
        raw_id: id.clone(),
        id,
        kind: PUBLIC_KEY_TYPE,
        authenticator_attachment: PLATFORM_ATTACHMENT,
        response: AssertionResponseJson {
            client_data_json: URL_SAFE_NO_PAD.encode(&assertion.client_data_json),
            authenticator_data: URL_SAFE_NO_PAD.encode(&assertion.authenticator_data),
            signature: URL_SAFE_NO_PAD.encode(&assertion.signature),
            user_handle: assertion
                .user_handle
                .as_ref()
                .map(|handle| URL_SAFE_NO_PAD.encode(handle)),
        },
        client_extension_results: serde_json::Map::new(),
    };
    Ok(serde_json::to_string(&credential)?)
}

fn decode_challenge(value: &str) -> CredentialResult<Vec<u8>> {
    let challenge = decode_field(value, "challenge")?;
    if challenge.is_empty() {
        return Err(CredentialError::invalid_input("challenge", "must not be empty"));
    }
    Ok(challenge)
}

fn decode_field(value: &str, attribute: &str) -> CredentialResult<Vec<u8>> {
    // Some servers pad their base64url output.
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| CredentialError::invalid_input(attribute, format!("invalid base64url: {e}")))
}

fn decode_descriptors(
    descriptors: &[CredentialDescriptorJson],
    attribute: &str,
) -> CredentialResult<Vec<Vec<u8>>> {
    descriptors
        .iter()
        .filter(|descriptor| {
            descriptor
                .kind
                .as_deref()
                .is_none_or(|kind| kind == PUBLIC_KEY_TYPE)
        })
        .map(|descriptor| decode_field(&descriptor.id, attribute))
        .collect()
}

/// Unknown values are ignored, as WebAuthn requires for enumerations.
fn user_verification(value: Option<&str>) -> UserVerification {
    value
        .and_then(|value| UserVerification::from_str(value).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_parse_creation_options() {
        let json = json!({
            "challenge": "Y2hhbGxlbmdl",
            "rp": { "id": "example.com", "name": "Example" },
            "user": { "id": "dXNlci0x", "name": "ada@example.com", "displayName": "Ada" },
            "pubKeyCredParams": [{ "type": "public-key", "alg": -7 }],
            "excludeCredentials": [{ "id": "AQID", "type": "public-key" }],
            "authenticatorSelection": { "userVerification": "required", "residentKey": "required" },
            "attestation": "none"
        });

        let options = parse_creation_options(&json.to_string()).unwrap();
        assert_eq!(options.challenge, b"challenge");
        assert_eq!(options.relying_party_id.as_deref(), Some("example.com"));
        assert_eq!(options.relying_party_name.as_deref(), Some("Example"));
        assert_eq!(options.user.id, b"user-1");
        assert_eq!(options.user.display_name, "Ada");
        assert_eq!(options.excluded_credentials, vec![vec![1, 2, 3]]);
        assert_eq!(options.user_verification, UserVerification::Required);
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let json = json!({
            "challenge": "Y2hhbGxlbmdl",
            "user": { "id": "dXNlci0x", "name": "ada" }
        });
        let options = parse_creation_options(&json.to_string()).unwrap();
        assert_eq!(options.user.display_name, "ada");
        assert_eq!(options.relying_party_id, None);
        assert_eq!(options.user_verification, UserVerification::Preferred);
    }

    #[test]
    fn test_parse_request_options_accepts_padding() {
        let json = json!({
            "challenge": "Y2hhbGxlbmdlMQ==",
            "rpId": "example.com",
            "allowCredentials": [
                { "id": "AQID", "type": "public-key" },
                { "id": "BAUG", "type": "future-type" }
            ],
            "userVerification": "something-new"
        });

        let options = parse_request_options(&json.to_string()).unwrap();
        assert_eq!(options.challenge, b"challenge1");
        assert_eq!(options.relying_party_id.as_deref(), Some("example.com"));
        assert_eq!(options.allowed_credentials, vec![vec![1, 2, 3]]);
        assert_eq!(options.user_verification, UserVerification::Preferred);
    }

    #[test]
    fn test_rejects_bad_input() {
        let empty_challenge = json!({ "challenge": "" }).to_string();
        assert!(matches!(
            parse_request_options(&empty_challenge),
            Err(CredentialError::InvalidInput { attribute, .. }) if attribute == "challenge"
        ));

        let bad_user = json!({
            "challenge": "Y2hhbGxlbmdl",
            "user": { "id": "not base64!", "name": "ada" }
        })
        .to_string();
        assert!(matches!(
            parse_creation_options(&bad_user),
            Err(CredentialError::InvalidInput { attribute, .. }) if attribute == "user.id"
        ));

        assert!(matches!(
            parse_request_options("{"),
            Err(CredentialError::SerializationError { .. })
        ));
    }

    #[test]
    fn test_authentication_response_json() {
        let assertion = PasskeyAssertion {
            credential_id: vec![1, 2, 3],
            authenticator_data: vec![4, 5],
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            signature: vec![6],
            user_handle: None,
        };

        let value: Value =
            serde_json::from_str(&authentication_response_json(&assertion).unwrap()).unwrap();
        assert_eq!(value["id"], "AQID");
        assert_eq!(value["rawId"], "AQID");
        assert_eq!(value["type"], "public-key");
        assert_eq!(value["authenticatorAttachment"], "platform");
        assert_eq!(value["response"]["authenticatorData"], "BAU");
        assert_eq!(value["response"]["signature"], "Bg");
        assert_eq!(
            value["response"]["clientDataJSON"],
            "eyJ0eXBlIjoid2ViYXV0aG4uZ2V0In0"
        );
        assert!(value["response"].get("userHandle").is_none());
        assert_eq!(value["clientExtensionResults"], json!({}));
    }

    #[test]
    fn test_registration_response_json() {
        let registration = PasskeyRegistration {
            credential_id: vec![0xfb, 0xff],
            attestation_object: vec![0xa0],
            client_data_json: b"{}".to_vec(),
        };

        let value: Value =
            serde_json::from_str(&registration_response_json(&registration).unwrap()).unwrap();
        assert_eq!(value["id"], "-_8");
        assert_eq!(value["response"]["attestationObject"], "oA");
        assert_eq!(value["response"]["clientDataJSON"], "e30");
    }
}
