//! In-memory collaborators for session manager tests

use super::backend::{CredentialBackend, ProfileResolver};
use super::manager::{SessionConfig, SessionManager};
use super::oauth::parse_callback;
use super::types::{
    AuthChange, AuthChangeEvent, AuthError, Identity, OAuthProvider, Profile, Role,
    SignUpMetadata,
};
use crate::navigation::{Navigator, Route};
use crate::notification::{Notice, NoticeLevel, Notifier};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Notify, broadcast};

/// Holds a fake call until the test opens it
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
    left: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
        self.left.notify_one();
    }

    /// Resolves once a call is parked at the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }

    /// Resolves once the parked call has gone through
    pub async fn left(&self) {
        self.left.notified().await;
    }
}

pub fn user_id_for(email: &str) -> String {
    format!("uid-{}", email.split('@').next().unwrap_or(email))
}

static TOKEN_SEQ: AtomicU64 = AtomicU64::new(1);

/// Fresh identity with unique tokens
pub fn identity_for(email: &str) -> Identity {
    let seq = TOKEN_SEQ.fetch_add(1, Ordering::Relaxed);
    Identity {
        user_id: user_id_for(email),
        email: email.to_string(),
        access_token: format!("access-{}", seq),
        refresh_token: format!("refresh-{}", seq),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub fn profile_for(email: &str, name: &str, role: Role) -> Profile {
    Profile {
        id: user_id_for(email),
        display_name: name.to_string(),
        email: email.to_string(),
        role,
        phone: None,
        photo_url: None,
    }
}

/// Credential backend backed by a password table
pub struct FakeBackend {
    events: broadcast::Sender<AuthChange>,
    accounts: Mutex<HashMap<String, String>>,
    stored: Mutex<Option<Identity>>,
    oauth_codes: Mutex<HashMap<String, String>>,
    pub require_confirmation: Mutex<bool>,
    pub sign_in_error: Mutex<Option<AuthError>>,
    pub oauth_error: Mutex<Option<AuthError>>,
    pub sign_out_error: Mutex<Option<AuthError>>,
    pub sign_in_gate: Mutex<Option<Arc<Gate>>>,
    pub sign_out_gate: Mutex<Option<Arc<Gate>>>,
    pub get_session_gate: Mutex<Option<Arc<Gate>>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub oauth_redirects: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            events,
            accounts: Mutex::new(HashMap::new()),
            stored: Mutex::new(None),
            oauth_codes: Mutex::new(HashMap::new()),
            require_confirmation: Mutex::new(false),
            sign_in_error: Mutex::new(None),
            oauth_error: Mutex::new(None),
            sign_out_error: Mutex::new(None),
            sign_in_gate: Mutex::new(None),
            sign_out_gate: Mutex::new(None),
            get_session_gate: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            oauth_redirects: Mutex::new(Vec::new()),
        })
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .insert(email.to_string(), password.to_string());
    }

    /// An authorization code that signs `email` in
    pub fn add_oauth_code(&self, code: &str, email: &str) {
        self.oauth_codes
            .lock()
            .insert(code.to_string(), email.to_string());
    }

    pub fn store(&self, identity: Identity) {
        *self.stored.lock() = Some(identity);
    }

    pub fn stored(&self) -> Option<Identity> {
        self.stored.lock().clone()
    }

    /// The session was ended elsewhere (another device, admin action)
    pub fn revoke(&self) {
        self.stored.lock().take();
        self.emit(AuthChangeEvent::SignedOut, None);
    }

    pub fn emit(&self, event: AuthChangeEvent, identity: Option<Identity>) {
        let _ = self.events.send(AuthChange::new(event, identity));
    }

    fn issue(&self, email: &str) -> Identity {
        let identity = identity_for(email);
        self.store(identity.clone());
        self.emit(AuthChangeEvent::SignedIn, Some(identity.clone()));
        identity
    }

    async fn gate(slot: &Mutex<Option<Arc<Gate>>>) {
        let gate = slot.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
    }
}

#[async_trait]
impl CredentialBackend for FakeBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        Self::gate(&self.sign_in_gate).await;
        if let Some(e) = self.sign_in_error.lock().take() {
            return Err(e);
        }
        let known = self.accounts.lock().get(email).cloned();
        match known {
            Some(expected) if expected == password => Ok(self.issue(email)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: &SignUpMetadata,
    ) -> Result<Option<Identity>, AuthError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        if self.accounts.lock().contains_key(email) {
            return Err(AuthError::ValidationError(
                "User already registered".to_string(),
            ));
        }
        self.add_account(email, password);
        if *self.require_confirmation.lock() {
            return Ok(None);
        }
        Ok(Some(self.issue(email)))
    }

    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        if let Some(e) = self.oauth_error.lock().take() {
            return Err(e);
        }
        self.oauth_redirects.lock().push(redirect_to.to_string());
        Ok(format!(
            "https://auth.test/authorize?provider={}",
            provider.as_str()
        ))
    }

    async fn exchange_oauth_callback(&self, callback_url: &str) -> Result<Identity, AuthError> {
        let code = parse_callback(callback_url)?;
        let email = self.oauth_codes.lock().get(&code).cloned();
        match email {
            Some(email) => Ok(self.issue(&email)),
            None => Err(AuthError::OAuthFailure("invalid flow state".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Self::gate(&self.sign_out_gate).await;
        self.stored.lock().take();
        self.emit(AuthChangeEvent::SignedOut, None);
        match self.sign_out_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn get_session(&self) -> Result<Option<Identity>, AuthError> {
        Self::gate(&self.get_session_gate).await;
        Ok(self.stored())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

/// Profile table keyed by user id
#[derive(Default)]
pub struct FakeResolver {
    profiles: Mutex<HashMap<String, Profile>>,
    failures: Mutex<HashMap<String, AuthError>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    fetched: Mutex<Vec<String>>,
    assigned: Mutex<Vec<(String, Role)>>,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles.lock().insert(profile.id.clone(), profile);
    }

    pub fn fail_for(&self, user_id: &str, error: AuthError) {
        self.failures.lock().insert(user_id.to_string(), error);
    }

    pub fn gate_for(&self, user_id: &str) -> Arc<Gate> {
        let gate = Gate::new();
        self.gates
            .lock()
            .insert(user_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// User ids looked up so far, in order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    pub fn assigned(&self) -> Vec<(String, Role)> {
        self.assigned.lock().clone()
    }
}

#[async_trait]
impl ProfileResolver for FakeResolver {
    async fn fetch_profile(&self, identity: &Identity) -> Result<Option<Profile>, AuthError> {
        self.fetched.lock().push(identity.user_id.clone());
        let gate = self.gates.lock().get(&identity.user_id).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if let Some(e) = self.failures.lock().get(&identity.user_id) {
            return Err(e.clone());
        }
        Ok(self.profiles.lock().get(&identity.user_id).cloned())
    }

    async fn assign_role(&self, identity: &Identity, role: Role) -> Result<Profile, AuthError> {
        self.assigned.lock().push((identity.user_id.clone(), role));
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(identity.user_id.clone())
            .or_insert_with(|| profile_for(&identity.email, &identity.email, Role::None));
        profile.role = role;
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices.lock().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

pub const ALICE: &str = "alice@farm.test";
pub const BOB: &str = "bob@land.test";
pub const CAROL: &str = "carol@corp.test";
pub const PASSWORD: &str = "secret1";

/// A manager wired to fakes, with one account per role
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub resolver: Arc<FakeResolver>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new() -> Self {
        let backend = FakeBackend::new();
        let resolver = FakeResolver::new();
        for (email, name, role) in [
            (ALICE, "Alice", Role::Farmer),
            (BOB, "Bob", Role::Landowner),
            (CAROL, "Carol", Role::Corporate),
        ] {
            backend.add_account(email, PASSWORD);
            resolver.insert(profile_for(email, name, role));
        }
        Self {
            backend,
            resolver,
            notifier: Arc::new(RecordingNotifier::default()),
            navigator: Arc::new(RecordingNavigator::default()),
        }
    }

    pub fn manager(&self) -> SessionManager {
        SessionManager::new(
            self.backend.clone(),
            self.resolver.clone(),
            SessionConfig::default(),
        )
        .with_notifier(self.notifier.clone())
        .with_navigator(self.navigator.clone())
    }

    pub async fn start(&self) -> Arc<SessionManager> {
        self.manager().start().await
    }
}

/// Let spawned tasks run on the current-thread test runtime
pub async fn drain() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
