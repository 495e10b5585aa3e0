//! `CredKit` exposes the platform's credential authentication service (passkeys, saved
//! passwords, Sign in with Apple, Sign in with Google) to cross-platform apps through
//! `UniFFI` bindings.
//!
//! The host implements [`AuthorizationService`] on top of `ASAuthorizationController` or
//! Android Credential Manager and forwards the platform's delegate callbacks to a
//! [`CredentialBridge`]. The bridge runs one ceremony at a time and resolves each async call
//! exactly once.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod bridge;
pub use bridge::*;

mod config;
pub use config::*;

mod credential;
pub use credential::*;

mod error;
pub use error::*;

/// Forwarding of log records to the host.
pub mod logger;

mod passkey;
pub use passkey::*;

/// Host platform contract.
pub mod platform;
pub use platform::{
    AppleIdRequest, AssertionRequest, Authorization, AuthorizationRequest,
    AuthorizationService, GoogleIdRequest, Platform, PlatformFailure, PlatformFailureCode,
    PlatformServiceError, PresentationAnchor, RegistrationRequest, SignInRequest,
};

/// WebAuthn JSON parsing and encoding.
pub mod webauthn;

uniffi::setup_scaffolding!("credkit_core");
