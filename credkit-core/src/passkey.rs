//! Passkey ceremony inputs and the credentials the platform returns for them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How strongly the relying party wants the user verified (biometrics, device passcode).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    /// User verification is required; the ceremony fails without it.
    Required,
    /// Verify the user when the authenticator can.
    #[default]
    Preferred,
    /// Do not verify the user.
    Discouraged,
}

/// The account a new passkey is registered for.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct UserIdentity {
    /// Opaque user handle chosen by the relying party. At most 64 bytes.
    pub id: Vec<u8>,
    /// Account name, usually an email address or username.
    pub name: String,
    /// Human readable name shown in the system sheet.
    pub display_name: String,
}

/// Options for a passkey assertion ("sign in with passkey") ceremony.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct AssertionOptions {
    /// Credential ids the relying party accepts. Empty means any discoverable credential.
    pub allowed_credentials: Vec<Vec<u8>>,
    /// User verification preference.
    pub user_verification: UserVerification,
    /// Fail with `AuthenticationUnavailable` instead of offering cross-device sign-in
    /// when no local credential exists.
    pub prefer_immediately_available_credentials: bool,
}

/// Options for a passkey registration ("create passkey") ceremony.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct RegistrationOptions {
    /// Credential ids already registered for the user; the platform refuses to create a duplicate.
    pub excluded_credentials: Vec<Vec<u8>>,
    /// User verification preference.
    pub user_verification: UserVerification,
    /// Only create the passkey on an authenticator available without user interaction elsewhere.
    pub prefer_immediately_available_credentials: bool,
}

/// Signed proof produced by an authenticator during sign-in.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PasskeyAssertion {
    /// Identifier of the credential that signed.
    pub credential_id: Vec<u8>,
    /// Raw authenticator data.
    pub authenticator_data: Vec<u8>,
    /// UTF-8 client data JSON the signature covers.
    pub client_data_json: Vec<u8>,
    /// Signature over `authenticator_data || sha256(client_data_json)`.
    pub signature: Vec<u8>,
    /// User handle stored with a discoverable credential.
    pub user_handle: Option<Vec<u8>>,
}

/// A newly created passkey.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PasskeyRegistration {
    /// Identifier of the new credential.
    pub credential_id: Vec<u8>,
    /// CBOR attestation object carrying the credential public key.
    pub attestation_object: Vec<u8>,
    /// UTF-8 client data JSON.
    pub client_data_json: Vec<u8>,
}
