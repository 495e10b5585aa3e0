//! The credential bridge: one platform authentication ceremony at a time.
//!
//! A ceremony moves the bridge from [`BridgeState::Idle`] to [`BridgeState::Pending`] and back.
//! Starting a ceremony installs a single pending value owning a oneshot result channel and
//! hands the request to the host's [`AuthorizationService`]. The host reports the outcome
//! through [`CredentialBridge::did_complete_with_authorization`] or
//! [`CredentialBridge::did_complete_with_error`]; whichever arrives first for the pending
//! ceremony id resolves the caller and clears the slot. A ceremony started while another is
//! pending fails with [`CredentialError::AlreadyInProgress`] and leaves the pending one alone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::config::{validate_relying_party_identifier, BridgeConfig};
use crate::credential::{
    AppleCredential, AppleScope, AppleSignInParams, Credential, GoogleCredential,
    GoogleSignInParams, PasswordCredential, SignInOption, SignInParams,
};
use crate::error::{CredentialError, CredentialResult};
use crate::passkey::{
    AssertionOptions, PasskeyAssertion, PasskeyRegistration, RegistrationOptions, UserIdentity,
};
use crate::platform::{
    AppleIdRequest, AssertionRequest, Authorization, AuthorizationRequest,
    AuthorizationService, GoogleIdRequest, Platform, PlatformFailure, PlatformFailureCode,
    PresentationAnchor, RegistrationRequest, SignInRequest,
};
use crate::webauthn;

type CeremonyResult = CredentialResult<Authorization>;

/// Whether a ceremony is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum BridgeState {
    /// No ceremony is pending; a new one may start.
    Idle,
    /// A ceremony is waiting for the platform to report its outcome.
    Pending,
}

/// The single in-flight ceremony.
struct PendingCeremony {
    id: u64,
    request: AuthorizationRequest,
    anchor: Option<Arc<dyn PresentationAnchor>>,
    sender: oneshot::Sender<CeremonyResult>,
}

/// Settings a ceremony request is built from.
struct Settings {
    relying_party_identifier: Option<String>,
    prefer_immediately_available_credentials: bool,
    apple_requested_scopes: Vec<AppleScope>,
}

impl Settings {
    /// The configured relying party, checked against the one named by request JSON.
    fn relying_party(&self, requested: Option<&str>) -> CredentialResult<String> {
        let configured = self
            .relying_party_identifier
            .as_deref()
            .ok_or(CredentialError::NotConfigured)?;
        match requested {
            Some(requested) if requested != configured => Err(CredentialError::invalid_input(
                "rp_id",
                format!("request targets {requested} but the bridge is configured for {configured}"),
            )),
            _ => Ok(configured.to_string()),
        }
    }
}

struct BridgeInner {
    settings: Settings,
    anchor: Option<Arc<dyn PresentationAnchor>>,
    pending: Option<PendingCeremony>,
    next_ceremony_id: u64,
}

/// A started ceremony waiting to be handed to the platform.
struct Ceremony {
    id: u64,
    request: AuthorizationRequest,
    anchor: Option<Arc<dyn PresentationAnchor>>,
    receiver: oneshot::Receiver<CeremonyResult>,
}

/// Bridge between the application and the platform's credential authentication service.
///
/// # Example (Swift)
///
/// ```swift
/// let service = PasskeyService()
/// let bridge = CredentialBridge(service: service)
/// service.bridge = bridge
/// try bridge.configure(relyingPartyIdentifier: "example.com")
///
/// let json = try await bridge.signUpWithPasskeys(requestJson: optionsJson, preferImmediatelyAvailableCredentials: false)
/// ```
#[derive(uniffi::Object)]
pub struct CredentialBridge {
    service: Arc<dyn AuthorizationService>,
    platform: Platform,
    inner: Mutex<BridgeInner>,
}

#[uniffi::export]
impl CredentialBridge {
    /// Creates an unconfigured bridge on top of the host's authorization service.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(service: Arc<dyn AuthorizationService>) -> Arc<Self> {
        let platform = service.platform();
        info!("credential bridge created for {platform}");
        Arc::new(Self {
            service,
            platform,
            inner: Mutex::new(BridgeInner {
                settings: Settings {
                    relying_party_identifier: None,
                    prefer_immediately_available_credentials: false,
                    apple_requested_scopes: vec![AppleScope::FullName, AppleScope::Email],
                },
                anchor: None,
                pending: None,
                next_ceremony_id: 1,
            }),
        })
    }

    /// Creates a bridge configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the relying party identifier is invalid.
    #[uniffi::constructor]
    pub fn with_config(
        service: Arc<dyn AuthorizationService>,
        config: BridgeConfig,
    ) -> CredentialResult<Arc<Self>> {
        validate_relying_party_identifier(&config.relying_party_identifier)?;
        let bridge = Self::new(service);
        {
            let mut inner = bridge.lock();
            inner.settings = Settings {
                relying_party_identifier: Some(config.relying_party_identifier),
                prefer_immediately_available_credentials: config
                    .prefer_immediately_available_credentials,
                apple_requested_scopes: config.apple_requested_scopes,
            };
        }
        Ok(bridge)
    }

    /// Stores the relying party identifier used by passkey ceremonies. Idempotent.
    ///
    /// A ceremony already pending keeps the identifier it started with.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the identifier is not a bare domain.
    pub fn configure(&self, relying_party_identifier: String) -> CredentialResult<()> {
        validate_relying_party_identifier(&relying_party_identifier)?;
        let mut inner = self.lock();
        let current = inner.settings.relying_party_identifier.as_deref();
        if current != Some(relying_party_identifier.as_str()) {
            info!("relying party identifier set to {relying_party_identifier}");
        }
        inner.settings.relying_party_identifier = Some(relying_party_identifier);
        Ok(())
    }

    /// The configured relying party identifier.
    #[must_use]
    pub fn relying_party_identifier(&self) -> Option<String> {
        self.lock().settings.relying_party_identifier.clone()
    }

    /// Platform reported by the authorization service.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Current state of the bridge.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        if self.lock().pending.is_some() {
            BridgeState::Pending
        } else {
            BridgeState::Idle
        }
    }

    /// Id of the pending ceremony, if any.
    #[must_use]
    pub fn pending_ceremony_id(&self) -> Option<u64> {
        self.lock().pending.as_ref().map(|pending| pending.id)
    }

    /// Sets the anchor used by ceremonies started from now on.
    ///
    /// `None` falls back to the service's default anchor at ceremony start.
    pub fn set_presentation_anchor(&self, anchor: Option<Arc<dyn PresentationAnchor>>) {
        self.lock().anchor = anchor;
    }

    /// Where the platform should present its sheet.
    ///
    /// Returns the anchor resolved for the pending ceremony, or the configured anchor when idle.
    #[must_use]
    pub fn presentation_anchor(&self) -> Option<Arc<dyn PresentationAnchor>> {
        let inner = self.lock();
        inner.pending.as_ref().map_or_else(
            || inner.anchor.clone(),
            |pending| pending.anchor.clone(),
        )
    }

    /// Delegate callback: the platform completed ceremony `ceremony_id` successfully.
    ///
    /// Signals for a ceremony that is not pending are ignored.
    pub fn did_complete_with_authorization(&self, ceremony_id: u64, authorization: Authorization) {
        let Some(pending) = self.take_pending(ceremony_id) else {
            warn!(
                "ignoring {} authorization for ceremony {ceremony_id}: not pending",
                authorization.kind()
            );
            return;
        };

        let result = if pending.request.accepts(&authorization) {
            info!("ceremony {ceremony_id} completed with {}", authorization.kind());
            Ok(authorization)
        } else {
            warn!(
                "ceremony {ceremony_id} ({}) completed with unexpected {}",
                pending.request.kind(),
                authorization.kind()
            );
            Err(CredentialError::UnexpectedCredential {
                expected: pending.request.kind().to_string(),
                received: authorization.kind().to_string(),
            })
        };
        Self::deliver(pending, result);
    }

    /// Delegate callback: the platform failed ceremony `ceremony_id`.
    ///
    /// Signals for a ceremony that is not pending are ignored.
    pub fn did_complete_with_error(&self, ceremony_id: u64, failure: PlatformFailure) {
        let Some(pending) = self.take_pending(ceremony_id) else {
            warn!("ignoring failure for ceremony {ceremony_id}: not pending ({failure})");
            return;
        };
        info!("ceremony {ceremony_id} failed: {failure}");
        Self::deliver(pending, Err(failure.into()));
    }

    /// Clears platform credential state.
    ///
    /// A no-op on iOS, where `AuthenticationServices` keeps no sign-in state for the app.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError` if the platform fails to clear its state.
    pub fn sign_out(&self) -> CredentialResult<()> {
        match self.platform {
            Platform::Ios => {
                debug!("sign out is a no-op on ios");
                Ok(())
            }
            Platform::Android => {
                self.service
                    .clear_credential_state()
                    .map_err(|e| CredentialError::from(PlatformFailure::from(e)))?;
                info!("platform credential state cleared");
                Ok(())
            }
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl CredentialBridge {
    /// Signs in with a passkey for the configured relying party.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` before [`Self::configure`].
    /// - `AlreadyInProgress` while another ceremony is pending.
    /// - `AuthenticationCancelled`, `AuthenticationUnavailable` or `PlatformError` as
    ///   reported by the platform.
    pub async fn request_assertion(
        &self,
        challenge: Vec<u8>,
        options: AssertionOptions,
    ) -> CredentialResult<PasskeyAssertion> {
        if challenge.is_empty() {
            return Err(CredentialError::invalid_input("challenge", "must not be empty"));
        }
        let authorization = self
            .perform(|settings| {
                Ok(AuthorizationRequest::PasskeyAssertion {
                    request: AssertionRequest {
                        relying_party_id: settings.relying_party(None)?,
                        challenge,
                        allowed_credentials: options.allowed_credentials,
                        user_verification: options.user_verification,
                        prefer_immediately_available_credentials: options
                            .prefer_immediately_available_credentials,
                    },
                })
            })
            .await?;

        match authorization {
            Authorization::PasskeyAssertion { assertion } => Ok(assertion),
            other => Err(unexpected("passkey_assertion", &other)),
        }
    }

    /// Creates a passkey for `user_identity` with the configured relying party.
    ///
    /// Uses the configured `prefer_immediately_available_credentials`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_assertion`], plus `InvalidInput` for an empty user id or name.
    pub async fn request_registration(
        &self,
        challenge: Vec<u8>,
        user_identity: UserIdentity,
    ) -> CredentialResult<PasskeyRegistration> {
        self.register(challenge, user_identity, None, None, None)
            .await
    }

    /// Creates a passkey from WebAuthn creation options JSON.
    ///
    /// Returns `RegistrationResponseJSON` for the relying party.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_registration`], plus `SerializationError` for malformed JSON and
    /// `InvalidInput` when `rp.id` differs from the configured relying party.
    pub async fn sign_up_with_passkeys(
        &self,
        request_json: String,
        prefer_immediately_available_credentials: bool,
    ) -> CredentialResult<String> {
        let options = webauthn::parse_creation_options(&request_json)?;
        let registration = self
            .register(
                options.challenge,
                options.user,
                options.relying_party_id,
                options.relying_party_name,
                Some(RegistrationOptions {
                    excluded_credentials: options.excluded_credentials,
                    user_verification: options.user_verification,
                    prefer_immediately_available_credentials,
                }),
            )
            .await?;
        webauthn::registration_response_json(&registration)
    }

    /// Signs in with any of `options`, presented together in one system sheet.
    ///
    /// Options the platform does not support are dropped.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `options` is empty or the parameters for an offered option are missing.
    /// - `UnsupportedOperation` if no option is supported on this platform.
    /// - Ceremony errors as for [`Self::request_assertion`]; `NotConfigured` only when passkeys
    ///   are offered.
    pub async fn sign_in(
        &self,
        options: Vec<SignInOption>,
        params: SignInParams,
    ) -> CredentialResult<Credential> {
        if options.is_empty() {
            return Err(CredentialError::invalid_input("options", "must not be empty"));
        }

        let mut offered: Vec<SignInOption> = Vec::with_capacity(options.len());
        for option in options {
            if !option.is_supported_on(self.platform) {
                warn!("dropping sign-in option {option}: not supported on {}", self.platform);
            } else if !offered.contains(&option) {
                offered.push(option);
            }
        }
        if offered.is_empty() {
            return Err(CredentialError::unsupported("sign_in", self.platform));
        }

        let passkey_options = if offered.contains(&SignInOption::Passkeys) {
            let json = params.passkeys.as_deref().ok_or_else(|| {
                CredentialError::invalid_input("passkeys", "required when offering passkeys")
            })?;
            Some(webauthn::parse_request_options(json)?)
        } else {
            None
        };
        let google = if offered.contains(&SignInOption::GoogleSignIn) {
            let params = params.google_sign_in.ok_or_else(|| {
                CredentialError::invalid_input("google_sign_in", "required when offering google-signin")
            })?;
            Some(google_request(params, true)?)
        } else {
            None
        };
        let apple_params = offered
            .contains(&SignInOption::AppleSignIn)
            .then_some(params.apple_sign_in);
        let password = offered.contains(&SignInOption::Password);

        let authorization = self
            .perform(move |settings| {
                let passkey = passkey_options
                    .map(|options| -> CredentialResult<AssertionRequest> {
                        Ok(AssertionRequest {
                            relying_party_id: settings
                                .relying_party(options.relying_party_id.as_deref())?,
                            challenge: options.challenge,
                            allowed_credentials: options.allowed_credentials,
                            user_verification: options.user_verification,
                            prefer_immediately_available_credentials: settings
                                .prefer_immediately_available_credentials,
                        })
                    })
                    .transpose()?;
                Ok(AuthorizationRequest::SignIn {
                    request: SignInRequest {
                        passkey,
                        password,
                        apple: apple_params.map(|params| apple_request(params, settings)),
                        google,
                    },
                })
            })
            .await?;

        match authorization {
            Authorization::PasskeyAssertion { assertion } => Ok(Credential::Passkey {
                authentication_response_json: webauthn::authentication_response_json(
                    &assertion,
                )?,
            }),
            Authorization::Password { credential } => Ok(Credential::Password { credential }),
            Authorization::GoogleId { credential } => Ok(Credential::GoogleSignIn { credential }),
            Authorization::AppleId { credential } => Ok(Credential::AppleSignIn { credential }),
            other => Err(unexpected("sign_in", &other)),
        }
    }

    /// Saves a password credential. Android only.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` on iOS, `InvalidInput` for an empty username or password, and
    /// ceremony errors as for [`Self::request_assertion`].
    pub async fn sign_up_with_password(
        &self,
        credential: PasswordCredential,
    ) -> CredentialResult<()> {
        if self.platform == Platform::Ios {
            return Err(CredentialError::unsupported("sign_up_with_password", self.platform));
        }
        if credential.username.is_empty() {
            return Err(CredentialError::invalid_input("username", "must not be empty"));
        }
        if credential.password.is_empty() {
            return Err(CredentialError::invalid_input("password", "must not be empty"));
        }

        match self
            .perform(|_| Ok(AuthorizationRequest::SavePassword { credential }))
            .await?
        {
            Authorization::PasswordSaved => Ok(()),
            other => Err(unexpected("save_password", &other)),
        }
    }

    /// Signs up with Google. Android only.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` on iOS, `InvalidInput` for an empty server client id, and
    /// ceremony errors as for [`Self::request_assertion`].
    pub async fn sign_up_with_google(
        &self,
        params: GoogleSignInParams,
    ) -> CredentialResult<GoogleCredential> {
        if self.platform == Platform::Ios {
            return Err(CredentialError::unsupported("sign_up_with_google", self.platform));
        }
        let request = google_request(params, false)?;

        match self
            .perform(|_| Ok(AuthorizationRequest::GoogleId { request }))
            .await?
        {
            Authorization::GoogleId { credential } => Ok(credential),
            other => Err(unexpected("google_id", &other)),
        }
    }

    /// Signs up with Apple. iOS only.
    ///
    /// Without `params` the nonce is empty and the configured default scopes are requested.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` on Android and ceremony errors as for [`Self::request_assertion`].
    pub async fn sign_up_with_apple(
        &self,
        params: Option<AppleSignInParams>,
    ) -> CredentialResult<AppleCredential> {
        if self.platform == Platform::Android {
            return Err(CredentialError::unsupported("sign_up_with_apple", self.platform));
        }

        match self
            .perform(|settings| {
                Ok(AuthorizationRequest::AppleId {
                    request: apple_request(params, settings),
                })
            })
            .await?
        {
            Authorization::AppleId { credential } => Ok(credential),
            other => Err(unexpected("apple_id", &other)),
        }
    }
}

impl CredentialBridge {
    fn lock(&self) -> MutexGuard<'_, BridgeInner> {
        // Nothing panics while the lock is held, so a poisoned state is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn register(
        &self,
        challenge: Vec<u8>,
        user: UserIdentity,
        requested_relying_party: Option<String>,
        relying_party_name: Option<String>,
        options: Option<RegistrationOptions>,
    ) -> CredentialResult<PasskeyRegistration> {
        if challenge.is_empty() {
            return Err(CredentialError::invalid_input("challenge", "must not be empty"));
        }
        if user.id.is_empty() {
            return Err(CredentialError::invalid_input("user.id", "must not be empty"));
        }
        if user.name.is_empty() {
            return Err(CredentialError::invalid_input("user.name", "must not be empty"));
        }

        let authorization = self
            .perform(|settings| {
                let options = options.unwrap_or_else(|| RegistrationOptions {
                    prefer_immediately_available_credentials: settings
                        .prefer_immediately_available_credentials,
                    ..RegistrationOptions::default()
                });
                Ok(AuthorizationRequest::PasskeyRegistration {
                    request: RegistrationRequest {
                        relying_party_id: settings
                            .relying_party(requested_relying_party.as_deref())?,
                        relying_party_name,
                        challenge,
                        user,
                        excluded_credentials: options.excluded_credentials,
                        user_verification: options.user_verification,
                        prefer_immediately_available_credentials: options
                            .prefer_immediately_available_credentials,
                    },
                })
            })
            .await?;

        match authorization {
            Authorization::PasskeyRegistration { registration } => Ok(registration),
            other => Err(unexpected("passkey_registration", &other)),
        }
    }

    /// Runs one ceremony: `Idle -> Pending`, hand off to the platform, wait for the result.
    async fn perform<F>(&self, build: F) -> CeremonyResult
    where
        F: FnOnce(&Settings) -> CredentialResult<AuthorizationRequest>,
    {
        let Ceremony {
            id,
            request,
            anchor,
            receiver,
        } = self.begin(build)?;

        info!(
            "starting ceremony {id} ({}) anchored to {}",
            request.kind(),
            anchor
                .as_ref()
                .map_or_else(|| "no anchor".to_string(), |anchor| anchor.identifier())
        );

        // The platform may complete the ceremony before this call returns, so no lock is held.
        if let Err(error) = self.service.perform_request(id, request, anchor) {
            let failure = PlatformFailure::from(error);
            if self.take_pending(id).is_some() {
                warn!("platform refused ceremony {id}: {failure}");
                return Err(failure.into());
            }
            debug!("platform reported {failure} after completing ceremony {id}");
        }

        receiver.await.unwrap_or_else(|_| {
            Err(CredentialError::from(
                PlatformFailureCode::Unknown.failure("ceremony ended without a result"),
            ))
        })
    }

    fn begin<F>(&self, build: F) -> CredentialResult<Ceremony>
    where
        F: FnOnce(&Settings) -> CredentialResult<AuthorizationRequest>,
    {
        let (request, anchor) = {
            let inner = self.lock();
            if let Some(pending) = &inner.pending {
                debug!("rejecting new ceremony: ceremony {} is pending", pending.id);
                return Err(CredentialError::AlreadyInProgress);
            }
            (build(&inner.settings)?, inner.anchor.clone())
        };

        // Looked up outside the lock; it calls into the host.
        let anchor = anchor.or_else(|| self.service.default_presentation_anchor());

        let mut inner = self.lock();
        if inner.pending.is_some() {
            return Err(CredentialError::AlreadyInProgress);
        }
        let id = inner.next_ceremony_id;
        inner.next_ceremony_id += 1;

        let (sender, receiver) = oneshot::channel();
        inner.pending = Some(PendingCeremony {
            id,
            request: request.clone(),
            anchor: anchor.clone(),
            sender,
        });

        Ok(Ceremony {
            id,
            request,
            anchor,
            receiver,
        })
    }

    /// Removes the pending ceremony if its id is `ceremony_id`.
    fn take_pending(&self, ceremony_id: u64) -> Option<PendingCeremony> {
        let mut inner = self.lock();
        if inner
            .pending
            .as_ref()
            .is_some_and(|pending| pending.id == ceremony_id)
        {
            inner.pending.take()
        } else {
            None
        }
    }

    fn deliver(pending: PendingCeremony, result: CeremonyResult) {
        if pending.sender.send(result).is_err() {
            debug!("caller of ceremony {} is gone; result dropped", pending.id);
        }
    }
}

fn unexpected(expected: &str, authorization: &Authorization) -> CredentialError {
    CredentialError::UnexpectedCredential {
        expected: expected.to_string(),
        received: authorization.kind().to_string(),
    }
}

fn google_request(
    params: GoogleSignInParams,
    filter_by_authorized_accounts: bool,
) -> CredentialResult<GoogleIdRequest> {
    if params.server_client_id.is_empty() {
        return Err(CredentialError::invalid_input(
            "server_client_id",
            "must not be empty",
        ));
    }
    Ok(GoogleIdRequest {
        nonce: params.nonce,
        server_client_id: params.server_client_id,
        filter_by_authorized_accounts,
        auto_select_enabled: params.auto_select_enabled,
    })
}

fn apple_request(params: Option<AppleSignInParams>, settings: &Settings) -> AppleIdRequest {
    params.map_or_else(
        || AppleIdRequest {
            nonce: String::new(),
            requested_scopes: settings.apple_requested_scopes.clone(),
        },
        |params| AppleIdRequest {
            nonce: params.nonce,
            requested_scopes: params.requested_scopes,
        },
    )
}
