//! Caller facing credential types returned by sign-in and sign-up ceremonies.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::platform::Platform;

/// A sign-in method the caller is willing to accept.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
pub enum SignInOption {
    /// Passkey assertion. Supported on both platforms.
    #[strum(serialize = "passkeys")]
    #[serde(rename = "passkeys")]
    Passkeys,
    /// Saved password. Supported on both platforms; saving one is Android only.
    #[strum(serialize = "password")]
    #[serde(rename = "password")]
    Password,
    /// Sign in with Google. Android only.
    #[strum(serialize = "google-signin")]
    #[serde(rename = "google-signin")]
    GoogleSignIn,
    /// Sign in with Apple. iOS only.
    #[strum(serialize = "apple-signin")]
    #[serde(rename = "apple-signin")]
    AppleSignIn,
}

impl SignInOption {
    /// Whether the option can be offered on `platform`.
    #[must_use]
    pub const fn is_supported_on(self, platform: Platform) -> bool {
        match self {
            Self::Passkeys | Self::Password => true,
            Self::GoogleSignIn => matches!(platform, Platform::Android),
            Self::AppleSignIn => matches!(platform, Platform::Ios),
        }
    }
}

/// Scopes that can be requested from Sign in with Apple.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum AppleScope {
    /// Given and family name.
    FullName,
    /// Email address (possibly a private relay address).
    Email,
}

/// Sign in with Google parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInParams {
    /// Nonce embedded in the returned ID token.
    #[serde(default)]
    pub nonce: String,
    /// OAuth web client id of the relying party backend.
    pub server_client_id: String,
    /// Sign the user in without a chooser when a single authorized account exists.
    #[serde(default = "default_auto_select")]
    pub auto_select_enabled: bool,
}

const fn default_auto_select() -> bool {
    true
}

/// Sign in with Apple parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct AppleSignInParams {
    /// Nonce embedded in the returned identity token.
    #[serde(default)]
    pub nonce: String,
    /// Requested scopes.
    #[serde(default = "default_apple_scopes")]
    pub requested_scopes: Vec<AppleScope>,
}

fn default_apple_scopes() -> Vec<AppleScope> {
    vec![AppleScope::FullName, AppleScope::Email]
}

impl Default for AppleSignInParams {
    fn default() -> Self {
        Self {
            nonce: String::new(),
            requested_scopes: default_apple_scopes(),
        }
    }
}

/// Parameters for a combined sign-in ceremony, keyed by sign-in method.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct SignInParams {
    /// WebAuthn `PublicKeyCredentialRequestOptions` JSON. Required when offering passkeys.
    pub passkeys: Option<String>,
    /// Used only on Android.
    pub google_sign_in: Option<GoogleSignInParams>,
    /// Used only on iOS.
    pub apple_sign_in: Option<AppleSignInParams>,
}

/// A saved password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct PasswordCredential {
    /// Account identifier.
    pub username: String,
    /// The password.
    pub password: String,
}

/// Credential returned by Sign in with Google.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCredential {
    /// Google account identifier (email address).
    pub id: String,
    /// Signed ID token for the backend.
    pub id_token: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Family name.
    pub family_name: Option<String>,
    /// Given name.
    pub given_name: Option<String>,
    /// Profile picture URL.
    pub profile_picture: Option<String>,
    /// Phone number.
    pub phone_number: Option<String>,
}

/// Credential returned by Sign in with Apple.
///
/// Name and email are only present the first time the user authorizes the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct AppleCredential {
    /// Stable Apple user identifier.
    pub id: String,
    /// Signed identity token (JWT) for the backend.
    pub id_token: String,
    /// Formatted full name.
    pub display_name: Option<String>,
    /// Family name.
    pub family_name: Option<String>,
    /// Given name.
    pub given_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
}

/// Credential resolved by [`crate::CredentialBridge::sign_in`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum Credential {
    /// A passkey assertion, encoded as WebAuthn authentication response JSON.
    Passkey {
        /// `PublicKeyCredential` JSON ready to post to the relying party.
        authentication_response_json: String,
    },
    /// A saved password.
    Password {
        /// The password credential.
        credential: PasswordCredential,
    },
    /// A Google ID token.
    GoogleSignIn {
        /// The Google credential.
        credential: GoogleCredential,
    },
    /// An Apple identity token.
    AppleSignIn {
        /// The Apple credential.
        credential: AppleCredential,
    },
}

impl Credential {
    /// The sign-in method that produced this credential.
    #[must_use]
    pub const fn option(&self) -> SignInOption {
        match self {
            Self::Passkey { .. } => SignInOption::Passkeys,
            Self::Password { .. } => SignInOption::Password,
            Self::GoogleSignIn { .. } => SignInOption::GoogleSignIn,
            Self::AppleSignIn { .. } => SignInOption::AppleSignIn,
        }
    }
}
