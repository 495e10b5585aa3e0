use thiserror::Error;

use crate::platform::{Platform, PlatformFailure};

/// Result type for bridge operations.
pub type CredentialResult<T, E = CredentialError> = std::result::Result<T, E>;

/// Error outputs from `CredKit`
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum CredentialError {
    /// A ceremony is already pending on this bridge. The pending ceremony is unaffected.
    #[error("already_in_progress")]
    AlreadyInProgress,
    /// The user dismissed the system sheet.
    #[error("authentication_cancelled")]
    AuthenticationCancelled,
    /// No credential or authenticator is available for the request.
    #[error("authentication_unavailable")]
    AuthenticationUnavailable,
    /// Any other failure reported by the platform authentication service.
    #[error("platform_error ({code}): {message}")]
    PlatformError {
        /// Platform error code.
        code: i64,
        /// Platform provided description.
        message: String,
    },
    /// A passkey ceremony was requested before a relying party identifier was configured.
    #[error("not_configured")]
    NotConfigured,
    /// The operation is not available on the current platform.
    #[error("unsupported_operation: {operation} is not available on {platform}")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: String,
        /// Platform the bridge is running on.
        platform: Platform,
    },
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that is invalid
        attribute: String,
        /// The reason the input is invalid
        reason: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// The error message from the serialization
        error: String,
    },
    /// The platform completed the ceremony with a credential of the wrong kind.
    #[error("unexpected_credential: expected {expected}, received {received}")]
    UnexpectedCredential {
        /// Credential kind the ceremony asked for.
        expected: String,
        /// Credential kind the platform returned.
        received: String,
    },
}

impl CredentialError {
    pub(crate) fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(operation: &str, platform: Platform) -> Self {
        Self::UnsupportedOperation {
            operation: operation.to_string(),
            platform,
        }
    }
}

impl From<PlatformFailure> for CredentialError {
    fn from(failure: PlatformFailure) -> Self {
        use crate::platform::PlatformFailureCode as Code;

        match Code::from_code(failure.code) {
            Some(Code::Canceled) => Self::AuthenticationCancelled,
            Some(Code::NotHandled | Code::NotInteractive | Code::NoCredentialAvailable) => {
                Self::AuthenticationUnavailable
            }
            _ => Self::PlatformError {
                code: failure.code,
                message: failure.message,
            },
        }
    }
}

impl From<serde_json::Error> for CredentialError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}
