//! Contract between the bridge and the host platform's authentication service.
//!
//! The host (Swift on iOS, Kotlin on Android) implements [`AuthorizationService`] on top of
//! `ASAuthorizationController` or Credential Manager. The bridge hands it one
//! [`AuthorizationRequest`] per ceremony and the host reports the outcome back through
//! [`crate::CredentialBridge::did_complete_with_authorization`] or
//! [`crate::CredentialBridge::did_complete_with_error`], passing the ceremony id it was given.
//!
//! # Example (Swift)
//!
//! ```swift
//! final class PasskeyService: NSObject, AuthorizationService, ASAuthorizationControllerDelegate {
//!     weak var bridge: CredentialBridge?
//!     private var ceremonies: [ObjectIdentifier: UInt64] = [:]
//!
//!     func platform() -> Platform { .ios }
//!
//!     func performRequest(ceremonyId: UInt64, request: AuthorizationRequest, anchor: PresentationAnchor?) throws {
//!         let controller = ASAuthorizationController(authorizationRequests: makeRequests(request))
//!         ceremonies[ObjectIdentifier(controller)] = ceremonyId
//!         controller.delegate = self
//!         controller.performRequests()
//!     }
//!
//!     func authorizationController(controller: ASAuthorizationController, didCompleteWithError error: Error) {
//!         let id = ceremonies.removeValue(forKey: ObjectIdentifier(controller))!
//!         let ns = error as NSError
//!         bridge?.didCompleteWithError(ceremonyId: id, failure: PlatformFailure(code: Int64(ns.code), message: ns.localizedDescription))
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::credential::{
    AppleCredential, AppleScope, GoogleCredential, PasswordCredential,
};
use crate::passkey::{
    PasskeyAssertion, PasskeyRegistration, UserIdentity, UserVerification,
};

/// Host platform the bridge runs on.
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS, iPadOS and visionOS (`AuthenticationServices`).
    Ios,
    /// Android (Credential Manager).
    Android,
}

/// Failure reported by the platform authentication service.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PlatformFailure {
    /// Error code. See [`PlatformFailureCode`].
    pub code: i64,
    /// Localized description from the platform.
    pub message: String,
}

impl fmt::Display for PlatformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Well-known failure codes.
///
/// The 1000 range follows `ASAuthorizationError.Code`. Android hosts map Credential Manager
/// exceptions onto the same codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFailureCode {
    /// The authorization attempt failed for an unknown reason.
    Unknown,
    /// The user canceled the authorization attempt.
    Canceled,
    /// The authorization request received an invalid response.
    InvalidResponse,
    /// The authorization request was not handled.
    NotHandled,
    /// The authorization attempt failed.
    Failed,
    /// The request required user interaction in a non-interactive context.
    NotInteractive,
    /// The user tried to register a credential listed in the excluded credentials.
    MatchedExcludedCredential,
    /// No credential or authenticator is available for the request.
    NoCredentialAvailable,
}

impl PlatformFailureCode {
    /// Numeric code as sent across the boundary.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Unknown => 1000,
            Self::Canceled => 1001,
            Self::InvalidResponse => 1002,
            Self::NotHandled => 1003,
            Self::Failed => 1004,
            Self::NotInteractive => 1005,
            Self::MatchedExcludedCredential => 1006,
            Self::NoCredentialAvailable => 2001,
        }
    }

    /// Looks up a well-known code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1000 => Some(Self::Unknown),
            1001 => Some(Self::Canceled),
            1002 => Some(Self::InvalidResponse),
            1003 => Some(Self::NotHandled),
            1004 => Some(Self::Failed),
            1005 => Some(Self::NotInteractive),
            1006 => Some(Self::MatchedExcludedCredential),
            2001 => Some(Self::NoCredentialAvailable),
            _ => None,
        }
    }

    /// Builds a failure with this code.
    #[must_use]
    pub fn failure(self, message: impl Into<String>) -> PlatformFailure {
        PlatformFailure {
            code: self.code(),
            message: message.into(),
        }
    }
}

/// Errors raised by the host across the boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum PlatformServiceError {
    /// The host refused or failed the call.
    #[error("platform service failure: {failure}")]
    Failure {
        /// What went wrong.
        failure: PlatformFailure,
    },
    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PlatformServiceError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

impl From<PlatformServiceError> for PlatformFailure {
    fn from(error: PlatformServiceError) -> Self {
        match error {
            PlatformServiceError::Failure { failure } => failure,
            PlatformServiceError::UnexpectedUniFFICallbackError(reason) => {
                PlatformFailureCode::Unknown.failure(reason)
            }
        }
    }
}

/// Opaque handle to the UI surface the system sheet is presented from
/// (`ASPresentationAnchor` on iOS, the current `Activity` on Android).
#[uniffi::export(with_foreign)]
pub trait PresentationAnchor: Send + Sync {
    /// Host defined identifier of the surface, used in logs.
    fn identifier(&self) -> String;
}

/// The platform's native authentication service.
#[uniffi::export(with_foreign)]
pub trait AuthorizationService: Send + Sync {
    /// Platform this service runs on.
    fn platform(&self) -> Platform;

    /// Starts a ceremony and returns immediately.
    ///
    /// The outcome must be delivered exactly once through the bridge's delegate callbacks,
    /// tagged with `ceremony_id`. The host may call back before this method returns.
    ///
    /// # Errors
    ///
    /// Returning an error ends the ceremony with that error; no callback is expected then.
    fn perform_request(
        &self,
        ceremony_id: u64,
        request: AuthorizationRequest,
        anchor: Option<Arc<dyn PresentationAnchor>>,
    ) -> Result<(), PlatformServiceError>;

    /// Looks up the presentation anchor from the running application, typically the key window.
    fn default_presentation_anchor(&self) -> Option<Arc<dyn PresentationAnchor>>;

    /// Clears any credential state cached by the platform for this app.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails.
    fn clear_credential_state(&self) -> Result<(), PlatformServiceError>;
}

/// Passkey assertion request as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AssertionRequest {
    /// Relying party the assertion is scoped to.
    pub relying_party_id: String,
    /// Server issued challenge.
    pub challenge: Vec<u8>,
    /// Credential ids the relying party accepts. Empty means any discoverable credential.
    pub allowed_credentials: Vec<Vec<u8>>,
    /// User verification preference.
    pub user_verification: UserVerification,
    /// See [`crate::AssertionOptions::prefer_immediately_available_credentials`].
    pub prefer_immediately_available_credentials: bool,
}

/// Passkey registration request as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct RegistrationRequest {
    /// Relying party the passkey is created for.
    pub relying_party_id: String,
    /// Relying party display name, if the caller provided one.
    pub relying_party_name: Option<String>,
    /// Server issued challenge.
    pub challenge: Vec<u8>,
    /// Account the passkey belongs to.
    pub user: UserIdentity,
    /// Credential ids already registered for the user.
    pub excluded_credentials: Vec<Vec<u8>>,
    /// User verification preference.
    pub user_verification: UserVerification,
    /// See [`crate::RegistrationOptions::prefer_immediately_available_credentials`].
    pub prefer_immediately_available_credentials: bool,
}

/// Sign in with Apple request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct AppleIdRequest {
    /// Nonce embedded in the identity token.
    pub nonce: String,
    /// Requested scopes.
    pub requested_scopes: Vec<AppleScope>,
}

/// Sign in with Google request.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct GoogleIdRequest {
    /// Nonce embedded in the ID token.
    pub nonce: String,
    /// OAuth web client id of the relying party backend.
    pub server_client_id: String,
    /// Only offer accounts that already authorized the app.
    pub filter_by_authorized_accounts: bool,
    /// Skip the chooser when a single account matches.
    pub auto_select_enabled: bool,
}

/// One system sheet offering every method the caller accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct SignInRequest {
    /// Offer passkeys.
    pub passkey: Option<AssertionRequest>,
    /// Offer saved passwords.
    pub password: bool,
    /// Offer Sign in with Apple.
    pub apple: Option<AppleIdRequest>,
    /// Offer Sign in with Google.
    pub google: Option<GoogleIdRequest>,
}

/// Request submitted to [`AuthorizationService::perform_request`].
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AuthorizationRequest {
    /// Sign in with a passkey.
    PasskeyAssertion {
        /// The assertion request.
        request: AssertionRequest,
    },
    /// Create a passkey.
    PasskeyRegistration {
        /// The registration request.
        request: RegistrationRequest,
    },
    /// Combined sign-in over several methods.
    SignIn {
        /// The offered methods.
        request: SignInRequest,
    },
    /// Sign up with Apple.
    AppleId {
        /// The Apple ID request.
        request: AppleIdRequest,
    },
    /// Sign up with Google.
    GoogleId {
        /// The Google ID request.
        request: GoogleIdRequest,
    },
    /// Save a password to the platform credential store.
    SavePassword {
        /// The password to save.
        credential: PasswordCredential,
    },
}

impl AuthorizationRequest {
    /// Whether `authorization` is an acceptable completion of this request.
    #[must_use]
    pub const fn accepts(&self, authorization: &Authorization) -> bool {
        match (self, authorization) {
            (Self::PasskeyAssertion { .. }, Authorization::PasskeyAssertion { .. })
            | (Self::PasskeyRegistration { .. }, Authorization::PasskeyRegistration { .. })
            | (Self::AppleId { .. }, Authorization::AppleId { .. })
            | (Self::GoogleId { .. }, Authorization::GoogleId { .. })
            | (Self::SavePassword { .. }, Authorization::PasswordSaved) => true,
            (Self::SignIn { request }, authorization) => match authorization {
                Authorization::PasskeyAssertion { .. } => request.passkey.is_some(),
                Authorization::Password { .. } => request.password,
                Authorization::AppleId { .. } => request.apple.is_some(),
                Authorization::GoogleId { .. } => request.google.is_some(),
                Authorization::PasskeyRegistration { .. } | Authorization::PasswordSaved => {
                    false
                }
            },
            _ => false,
        }
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PasskeyAssertion { .. } => "passkey_assertion",
            Self::PasskeyRegistration { .. } => "passkey_registration",
            Self::SignIn { .. } => "sign_in",
            Self::AppleId { .. } => "apple_id",
            Self::GoogleId { .. } => "google_id",
            Self::SavePassword { .. } => "save_password",
        }
    }
}

/// Successful outcome reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum Authorization {
    /// A passkey assertion.
    PasskeyAssertion {
        /// The assertion.
        assertion: PasskeyAssertion,
    },
    /// A new passkey.
    PasskeyRegistration {
        /// The registration.
        registration: PasskeyRegistration,
    },
    /// A saved password picked by the user.
    Password {
        /// The password credential.
        credential: PasswordCredential,
    },
    /// A Sign in with Apple credential.
    AppleId {
        /// The Apple credential.
        credential: AppleCredential,
    },
    /// A Sign in with Google credential.
    GoogleId {
        /// The Google credential.
        credential: GoogleCredential,
    },
    /// The password was saved.
    PasswordSaved,
}

impl Authorization {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PasskeyAssertion { .. } => "passkey_assertion",
            Self::PasskeyRegistration { .. } => "passkey_registration",
            Self::Password { .. } => "password",
            Self::AppleId { .. } => "apple_id",
            Self::GoogleId { .. } => "google_id",
            Self::PasswordSaved => "password_saved",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn password() -> PasswordCredential {
        PasswordCredential {
            username: "ada".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_failure_codes_round_trip_known_values() {
        for code in 1000..=1006 {
            let known = PlatformFailureCode::from_code(code).expect("known code");
            assert_eq!(known.code(), code);
        }
        assert_eq!(
            PlatformFailureCode::from_code(2001),
            Some(PlatformFailureCode::NoCredentialAvailable)
        );
        assert_eq!(PlatformFailureCode::from_code(42), None);
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!(Platform::from_str("ios").unwrap(), Platform::Ios);
        assert_eq!(Platform::from_str("Android").unwrap(), Platform::Android);
        assert!(Platform::from_str("windows").is_err());
        assert_eq!(Platform::Android.to_string(), "android");
    }

    #[test]
    fn test_sign_in_accepts_only_offered_methods() {
        let request = AuthorizationRequest::SignIn {
            request: SignInRequest {
                password: true,
                ..SignInRequest::default()
            },
        };
        assert!(request.accepts(&Authorization::Password {
            credential: password()
        }));
        assert!(!request.accepts(&Authorization::AppleId {
            credential: AppleCredential {
                id: "001".to_string(),
                id_token: "jwt".to_string(),
                display_name: None,
                family_name: None,
                given_name: None,
                email: None,
            }
        }));
        assert!(!request.accepts(&Authorization::PasswordSaved));
    }

    #[test]
    fn test_save_password_accepts_confirmation_only() {
        let request = AuthorizationRequest::SavePassword {
            credential: password(),
        };
        assert!(request.accepts(&Authorization::PasswordSaved));
        assert!(!request.accepts(&Authorization::Password {
            credential: password()
        }));
    }

    #[test]
    fn test_service_error_converts_to_failure() {
        let failure: PlatformFailure = PlatformServiceError::UnexpectedUniFFICallbackError(
            "swift threw".to_string(),
        )
        .into();
        assert_eq!(failure.code, PlatformFailureCode::Unknown.code());
        assert_eq!(failure.message, "swift threw");
    }
}
