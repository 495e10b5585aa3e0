//! Common test utilities shared across integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use credkit_core::{
    Authorization, AuthorizationRequest, AuthorizationService, CredentialBridge,
    PasskeyAssertion, PasskeyRegistration, Platform, PlatformFailure, PlatformServiceError,
    PresentationAnchor,
};
use tokio::sync::mpsc;

pub struct TestAnchor(pub String);

impl PresentationAnchor for TestAnchor {
    fn identifier(&self) -> String {
        self.0.clone()
    }
}

/// What the scripted platform does with the next request.
#[allow(dead_code, reason = "used in tests")]
pub enum Step {
    /// Report success from inside `perform_request`.
    Complete(Authorization),
    /// Report failure from inside `perform_request`.
    Fail(PlatformFailure),
    /// Refuse the request synchronously.
    Refuse(PlatformFailure),
}

/// A request as the platform saw it.
#[allow(dead_code, reason = "used in tests")]
pub struct PerformedRequest {
    pub ceremony_id: u64,
    pub request: AuthorizationRequest,
    pub anchor: Option<String>,
}

/// Authorization service driven by a script. Requests without a scripted step stay pending
/// until the test completes them through the bridge.
pub struct ScriptedService {
    platform: Platform,
    bridge: OnceLock<Weak<CredentialBridge>>,
    script: Mutex<VecDeque<Step>>,
    requests_tx: mpsc::UnboundedSender<PerformedRequest>,
    requests_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PerformedRequest>>,
    default_anchor: Mutex<Option<Arc<dyn PresentationAnchor>>>,
    cleared: AtomicUsize,
    clear_failure: Mutex<Option<PlatformFailure>>,
}

impl ScriptedService {
    pub fn new(platform: Platform) -> Arc<Self> {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            platform,
            bridge: OnceLock::new(),
            script: Mutex::new(VecDeque::new()),
            requests_tx,
            requests_rx: tokio::sync::Mutex::new(requests_rx),
            default_anchor: Mutex::new(None),
            cleared: AtomicUsize::new(0),
            clear_failure: Mutex::new(None),
        })
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    #[allow(dead_code, reason = "used in tests")]
    pub fn set_default_anchor(&self, anchor: &str) {
        *self.default_anchor.lock().unwrap() = Some(Arc::new(TestAnchor(anchor.to_string())));
    }

    #[allow(dead_code, reason = "used in tests")]
    pub fn fail_clear(&self, failure: PlatformFailure) {
        *self.clear_failure.lock().unwrap() = Some(failure);
    }

    #[allow(dead_code, reason = "used in tests")]
    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }

    /// Waits for the next request the bridge hands to the platform.
    pub async fn next_request(&self) -> PerformedRequest {
        self.requests_rx
            .lock()
            .await
            .recv()
            .await
            .expect("service dropped")
    }

    fn bridge(&self) -> Arc<CredentialBridge> {
        self.bridge
            .get()
            .and_then(Weak::upgrade)
            .expect("bridge attached")
    }
}

impl AuthorizationService for ScriptedService {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn perform_request(
        &self,
        ceremony_id: u64,
        request: AuthorizationRequest,
        anchor: Option<Arc<dyn PresentationAnchor>>,
    ) -> Result<(), PlatformServiceError> {
        let _ = self.requests_tx.send(PerformedRequest {
            ceremony_id,
            request,
            anchor: anchor.map(|anchor| anchor.identifier()),
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Complete(authorization)) => {
                self.bridge()
                    .did_complete_with_authorization(ceremony_id, authorization);
                Ok(())
            }
            Some(Step::Fail(failure)) => {
                self.bridge().did_complete_with_error(ceremony_id, failure);
                Ok(())
            }
            Some(Step::Refuse(failure)) => Err(PlatformServiceError::Failure { failure }),
            None => Ok(()),
        }
    }

    fn default_presentation_anchor(&self) -> Option<Arc<dyn PresentationAnchor>> {
        self.default_anchor.lock().unwrap().clone()
    }

    fn clear_credential_state(&self) -> Result<(), PlatformServiceError> {
        if let Some(failure) = self.clear_failure.lock().unwrap().clone() {
            return Err(PlatformServiceError::Failure { failure });
        }
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A bridge wired to a fresh scripted service.
pub fn setup(platform: Platform) -> (Arc<ScriptedService>, Arc<CredentialBridge>) {
    let service = ScriptedService::new(platform);
    let bridge = CredentialBridge::new(service.clone());
    assert!(service.bridge.set(Arc::downgrade(&bridge)).is_ok());
    (service, bridge)
}

/// A configured bridge for `example.com`.
pub fn configured(platform: Platform) -> (Arc<ScriptedService>, Arc<CredentialBridge>) {
    let (service, bridge) = setup(platform);
    bridge.configure("example.com".to_string()).unwrap();
    (service, bridge)
}

pub fn sample_assertion() -> PasskeyAssertion {
    PasskeyAssertion {
        credential_id: vec![0xc0, 0xff, 0xee],
        authenticator_data: vec![0x49; 37],
        client_data_json: br#"{"type":"webauthn.get","challenge":"Y2hhbGxlbmdlMQ"}"#.to_vec(),
        signature: vec![0x30, 0x45, 0x02, 0x20],
        user_handle: Some(b"user-1".to_vec()),
    }
}

#[allow(dead_code, reason = "used in tests")]
pub fn sample_registration() -> PasskeyRegistration {
    PasskeyRegistration {
        credential_id: vec![0xc0, 0xff, 0xee],
        attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74],
        client_data_json: br#"{"type":"webauthn.create"}"#.to_vec(),
    }
}
