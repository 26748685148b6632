//! Session manager - owns the signed-in user lifecycle
//!
//! One [`SessionManager`] per app. It is the only writer of the session;
//! pages read it through [`SessionManager::current_session`] or
//! [`SessionManager::subscribe`].
//!
//! Two paths change the identity: explicit operations (login, register,
//! OAuth, logout) and the credential backend's auth-change stream. Both go
//! through the same adoption step, which bumps a generation counter whenever
//! the user changes. Profile lookups remember the generation they started
//! for and are dropped if it moved on in the meantime.

use super::backend::{CredentialBackend, ProfileResolver};
use super::oauth::PendingSignup;
use super::types::{
    AuthChange, AuthChangeEvent, AuthError, AuthState, Identity, OAuthProvider, Profile,
    RegisterOutcome, Role, Session, SignUpMetadata,
};
use crate::navigation::{LogNavigator, Navigator, Route};
use crate::notification::{LogNotifier, Notice, Notifier};
use crate::settings::AppSettings;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const MIN_PASSWORD_LEN: usize = 6;

/// Tunables for the session manager
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for every backend call; expiry is reported as a network failure
    pub request_timeout: Duration,
    /// Where the OAuth provider sends the user back to
    pub redirect_to: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&AppSettings::default())
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            request_timeout: settings.request_timeout(),
            redirect_to: settings.oauth_redirect_url(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    /// Bumped whenever the identity changes or the session is reset
    generation: u64,
    /// Bumped on every sign-out, local or upstream
    signout_epoch: u64,
    /// Access token of the last locally signed-out identity
    retired_token: Option<String>,
    /// An upstream identity arrived while credentials were being checked
    missed_upstream: bool,
}

/// Precondition for adopting an identity
#[derive(Debug, Clone, Copy)]
enum Expect {
    Any,
    /// Nothing else touched the identity since this generation
    Generation(u64),
    /// No sign-out happened since this epoch
    SignoutEpoch(u64),
}

#[derive(Debug)]
enum Adoption {
    /// New user; profile resolution must run for this generation
    Started(u64, Identity),
    /// Same user, resolution already running
    InFlight,
    /// Same user, already resolved; tokens updated
    Current,
    /// Precondition failed or token was retired
    Rejected,
}

/// Releases the single in-flight operation slot on drop
struct OperationGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Authentication session manager
pub struct SessionManager {
    backend: Arc<dyn CredentialBackend>,
    resolver: Arc<dyn ProfileResolver>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    session_tx: watch::Sender<Session>,
    busy: AtomicBool,
    pending_signup: PendingSignup,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager. Nothing runs until [`SessionManager::start`].
    pub fn new(
        backend: Arc<dyn CredentialBackend>,
        resolver: Arc<dyn ProfileResolver>,
        config: SessionConfig,
    ) -> Self {
        let (session_tx, _) = watch::channel(Session::default());
        Self {
            backend,
            resolver,
            notifier: Arc::new(LogNotifier),
            navigator: Arc::new(LogNavigator),
            config,
            inner: Mutex::new(Inner::default()),
            session_tx,
            busy: AtomicBool::new(false),
            pending_signup: PendingSignup::new(),
            listener: Mutex::new(None),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Subscribe to the backend, then restore any persisted session.
    ///
    /// The subscription is taken first so no event is missed while the
    /// stored session is being loaded.
    pub async fn start(self) -> Arc<Self> {
        let manager = Arc::new(self);
        let events = manager.backend.on_auth_state_change();
        let handle = Self::spawn_listener(Arc::downgrade(&manager), events);
        *manager.listener.lock() = Some(handle);

        manager.restore().await;
        manager.settled().await;
        manager
    }

    /// Stop listening to the backend. Idempotent.
    pub fn dispose(&self) {
        if let Some(handle) = self.listener.lock().take() {
            debug!("Disposing session manager listener");
            handle.abort();
        }
    }

    /// Snapshot of the current session
    pub fn current_session(&self) -> Session {
        self.session_tx.borrow().clone()
    }

    /// Reactive view of the session
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_tx.borrow().is_authenticated()
    }

    /// Whether an OAuth sign-up is waiting for its redirect
    pub fn has_pending_signup(&self) -> bool {
        self.pending_signup.is_pending()
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        const TITLE: &str = "Sign in failed";
        let _guard = self
            .begin_operation()
            .inspect_err(|e| self.report_failure(TITLE, e))?;

        info!("Signing in user: {}", email);
        let epoch = self.signout_epoch();
        let (generation, previous) = self.enter_authenticating();

        let result = self
            .with_timeout(self.backend.sign_in_with_password(email, password))
            .await;
        let identity = match result {
            Ok(identity) => identity,
            Err(e) => {
                self.abort_authenticating(generation, previous).await;
                self.report_failure(TITLE, &e);
                return Err(e);
            }
        };

        let session = self
            .complete_sign_in(identity, epoch)
            .await
            .inspect_err(|e| self.report_failure(TITLE, e))?;
        self.announce_signed_in(&session, "Welcome back");
        Ok(session)
    }

    /// Create an account. Name and role travel as sign-up metadata so the
    /// backend can create the profile.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<RegisterOutcome, AuthError> {
        const TITLE: &str = "Registration failed";
        validate_registration(name, email, password, role)
            .inspect_err(|e| self.report_failure(TITLE, e))?;
        let _guard = self
            .begin_operation()
            .inspect_err(|e| self.report_failure(TITLE, e))?;

        info!("Registering {} as {}", email, role);
        let epoch = self.signout_epoch();
        let (generation, previous) = self.enter_authenticating();

        let metadata = SignUpMetadata {
            full_name: name.trim().to_string(),
            role,
        };
        let result = self
            .with_timeout(self.backend.sign_up(email, password, &metadata))
            .await;

        match result {
            Ok(Some(identity)) => {
                let session = self
                    .complete_sign_in(identity, epoch)
                    .await
                    .inspect_err(|e| self.report_failure(TITLE, e))?;
                self.announce_signed_in(&session, "Welcome to AgriLink");
                Ok(RegisterOutcome::SignedIn)
            }
            Ok(None) => {
                self.abort_authenticating(generation, previous).await;
                self.notifier.notify(Notice::info(
                    "Confirm your e-mail",
                    format!("We sent a confirmation link to {}", email),
                ));
                Ok(RegisterOutcome::ConfirmationRequired)
            }
            Err(e) => {
                self.abort_authenticating(generation, previous).await;
                self.report_failure(TITLE, &e);
                Err(e)
            }
        }
    }

    /// Sign out. The local session is cleared before anything is awaited;
    /// a failing backend call is only logged.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.session.identity.take();
            if let Some(identity) = &previous {
                inner.retired_token = Some(identity.access_token.clone());
            }
            inner.generation += 1;
            inner.signout_epoch += 1;
            inner.session = Session::default();
            self.publish(&inner);
            previous
        };
        self.pending_signup.clear();

        match &previous {
            Some(identity) => info!("Logging out {}", identity.email),
            None => debug!("Logout without an active session"),
        }
        self.notifier
            .notify(Notice::success("Signed out", "You have been signed out."));
        self.navigator.navigate(Route::Landing);

        if let Err(e) = self.with_timeout(self.backend.sign_out()).await {
            warn!("Backend sign-out failed (local session already cleared): {}", e);
        }
        Ok(())
    }

    /// Start Google sign-in. Returns the URL the browser was sent to.
    pub fn login_with_google(&self) -> Result<String, AuthError> {
        self.pending_signup.clear();
        self.start_oauth()
    }

    /// Start Google sign-up for `role`. The role is applied once
    /// [`SessionManager::complete_oauth`] runs.
    pub fn signup_with_google(&self, role: Role) -> Result<String, AuthError> {
        if role == Role::None {
            let e = AuthError::ValidationError("Please choose a role".to_string());
            self.report_failure("Google sign-in failed", &e);
            return Err(e);
        }

        self.pending_signup.set(role);
        self.start_oauth().inspect_err(|_| self.pending_signup.clear())
    }

    fn start_oauth(&self) -> Result<String, AuthError> {
        const TITLE: &str = "Google sign-in failed";
        let _guard = self
            .begin_operation()
            .inspect_err(|e| self.report_failure(TITLE, e))?;

        match self
            .backend
            .sign_in_with_oauth(OAuthProvider::Google, &self.config.redirect_to)
        {
            Ok(url) => {
                self.notifier.notify(Notice::info(
                    "Continue in your browser",
                    "Finish signing in with Google in the browser window.",
                ));
                Ok(url)
            }
            Err(e) => {
                let e = match e {
                    AuthError::OAuthFailure(_) => e,
                    other => AuthError::OAuthFailure(other.to_string()),
                };
                self.report_failure(TITLE, &e);
                Err(e)
            }
        }
    }

    /// Finish an OAuth flow from the URL the provider redirected back to
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<Session, AuthError> {
        const TITLE: &str = "Google sign-in failed";
        let _guard = self
            .begin_operation()
            .inspect_err(|e| self.report_failure(TITLE, e))?;

        let epoch = self.signout_epoch();
        let (generation, previous) = self.enter_authenticating();

        let result = self
            .with_timeout(self.backend.exchange_oauth_callback(callback_url))
            .await;
        let identity = match result {
            Ok(identity) => identity,
            Err(e) => {
                self.abort_authenticating(generation, previous).await;
                self.pending_signup.clear();
                self.report_failure(TITLE, &e);
                return Err(e);
            }
        };

        let mut session = self
            .complete_sign_in(identity, epoch)
            .await
            .inspect_err(|e| self.report_failure(TITLE, e))?;

        if let Some(role) = self.pending_signup.take() {
            session = self.apply_signup_role(role).await;
        }

        self.announce_signed_in(&session, "Welcome");
        Ok(session)
    }

    /// Forget a started OAuth flow
    pub fn cancel_oauth(&self) {
        info!("Cancelling OAuth flow");
        self.pending_signup.clear();
    }

    /// Re-run profile resolution for the current identity, e.g. after the
    /// role was changed elsewhere. A failed lookup keeps the old profile.
    pub async fn refresh_profile(&self) -> Result<Session, AuthError> {
        let (generation, identity) = {
            let inner = self.inner.lock();
            match (&inner.session.state, &inner.session.identity) {
                (AuthState::Authenticated, Some(identity)) => {
                    (inner.generation, identity.clone())
                }
                _ => return Err(AuthError::NotAuthenticated),
            }
        };

        match self.lookup_profile(&identity).await {
            Ok(profile) => {
                let mut inner = self.inner.lock();
                if inner.generation == generation {
                    inner.session.profile = profile;
                    self.publish(&inner);
                } else {
                    debug!("Identity changed during profile refresh, discarding result");
                }
            }
            Err(e) => warn!("Profile refresh failed, keeping previous profile: {}", e),
        }
        Ok(self.current_session())
    }

    // ----------------------------------------------------------------------
    // Upstream events
    // ----------------------------------------------------------------------

    fn spawn_listener(
        manager: Weak<Self>,
        mut events: broadcast::Receiver<AuthChange>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                match received {
                    Ok(change) => manager.handle_auth_change(change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} auth events, resynchronising", skipped);
                        let manager = Arc::clone(&manager);
                        tokio::spawn(async move { manager.restore().await });
                    }
                    Err(RecvError::Closed) => {
                        debug!("Auth event stream closed");
                        break;
                    }
                }
            }
        })
    }

    fn handle_auth_change(self: &Arc<Self>, change: AuthChange) {
        debug!("Auth event {:?}", change.event);
        match (change.event, change.identity) {
            (AuthChangeEvent::SignedOut, _) | (_, None) => self.clear_from_upstream(),
            (_, Some(_)) if self.current_session().state == AuthState::AuthenticatingCredentials => {
                // The running operation adopts its own result
                debug!("Sign-in in progress, leaving {:?} to it", change.event);
                self.inner.lock().missed_upstream = true;
            }
            (_, Some(identity)) => {
                if let Adoption::Started(generation, identity) =
                    self.adopt_identity(identity, Expect::Any)
                {
                    let manager = Arc::clone(self);
                    tokio::spawn(async move {
                        manager.resolve_profile(generation, identity).await;
                    });
                }
            }
        }
    }

    /// Backend reported the session as gone
    fn clear_from_upstream(&self) {
        {
            let mut inner = self.inner.lock();
            match inner.session.state {
                AuthState::Unauthenticated => return,
                AuthState::AuthenticatingCredentials => {
                    // The session parked by the running operation is gone;
                    // it must not come back if the operation fails
                    warn!("Previous session ended by the backend during sign-in");
                    inner.generation += 1;
                    inner.missed_upstream = false;
                    return;
                }
                AuthState::ResolvingProfile | AuthState::Authenticated => {}
            }
            inner.generation += 1;
            inner.signout_epoch += 1;
            inner.session = Session::default();
            self.publish(&inner);
        }

        warn!("Session ended by the backend");
        self.notifier.notify(Notice::info(
            "Signed out",
            "Your session has ended. Please sign in again.",
        ));
        self.navigator.navigate(Route::Landing);
    }

    /// Load the persisted session. A result that arrives after some other
    /// identity change is dropped.
    async fn restore(&self) {
        let generation = self.inner.lock().generation;

        match self.with_timeout(self.backend.get_session()).await {
            Ok(Some(identity)) => {
                info!("Restoring session for {}", identity.email);
                match self.adopt_identity(identity, Expect::Generation(generation)) {
                    Adoption::Started(generation, identity) => {
                        self.resolve_profile(generation, identity).await;
                    }
                    Adoption::Rejected => debug!("Stored session superseded by a newer event"),
                    Adoption::InFlight | Adoption::Current => {}
                }
            }
            Ok(None) => {
                let stale = {
                    let inner = self.inner.lock();
                    inner.generation == generation && inner.session.identity.is_some()
                };
                if stale {
                    // Resync after lag: the sign-out event itself was missed
                    self.clear_from_upstream();
                } else {
                    debug!("No stored session");
                }
            }
            Err(e) => warn!("Could not restore session: {}", e),
        }
    }

    // ----------------------------------------------------------------------
    // State transitions
    // ----------------------------------------------------------------------

    fn publish(&self, inner: &Inner) {
        self.session_tx.send_replace(inner.session.clone());
    }

    fn signout_epoch(&self) -> u64 {
        self.inner.lock().signout_epoch
    }

    fn begin_operation(&self) -> Result<OperationGuard<'_>, AuthError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AuthError::OperationInProgress);
        }
        let guard = OperationGuard { busy: &self.busy };

        // A restore or upstream sign-in may be resolving a profile right now
        if self.inner.lock().session.state == AuthState::ResolvingProfile {
            return Err(AuthError::OperationInProgress);
        }
        Ok(guard)
    }

    /// Enter AuthenticatingCredentials, returning what to restore on failure
    fn enter_authenticating(&self) -> (u64, Session) {
        let mut inner = self.inner.lock();
        let previous = std::mem::replace(&mut inner.session, Session::authenticating());
        inner.generation += 1;
        inner.missed_upstream = false;
        self.publish(&inner);
        (inner.generation, previous)
    }

    /// Undo [`Self::enter_authenticating`] after a failed operation.
    ///
    /// The previous session only comes back if nothing happened upstream in
    /// the meantime. Identities announced while the operation ran are picked
    /// up again through the backend.
    async fn abort_authenticating(&self, generation: u64, previous: Session) {
        let resync = {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                inner.session = previous;
                self.publish(&inner);
            } else if inner.session.state == AuthState::AuthenticatingCredentials {
                inner.session = Session::default();
                self.publish(&inner);
            }
            std::mem::take(&mut inner.missed_upstream)
        };
        if resync {
            debug!("Picking up identity announced during the failed operation");
            self.restore().await;
        }
    }

    fn adopt_identity(&self, identity: Identity, expect: Expect) -> Adoption {
        let mut inner = self.inner.lock();

        let allowed = match expect {
            Expect::Any => true,
            Expect::Generation(generation) => inner.generation == generation,
            Expect::SignoutEpoch(epoch) => inner.signout_epoch == epoch,
        };
        if !allowed {
            return Adoption::Rejected;
        }
        // Explicit sign-ins always carry fresh tokens
        let upstream = !matches!(expect, Expect::SignoutEpoch(_));
        if upstream && inner.retired_token.as_deref() == Some(identity.access_token.as_str()) {
            debug!("Ignoring identity with a signed-out token");
            return Adoption::Rejected;
        }

        if let Some(current) = &inner.session.identity {
            if current.same_user(&identity) {
                let state = inner.session.state;
                inner.session.identity = Some(identity);
                self.publish(&inner);
                return if state == AuthState::ResolvingProfile {
                    Adoption::InFlight
                } else {
                    Adoption::Current
                };
            }
        }

        inner.generation += 1;
        inner.session = Session::resolving(identity.clone());
        self.publish(&inner);
        Adoption::Started(inner.generation, identity)
    }

    async fn lookup_profile(&self, identity: &Identity) -> Result<Option<Profile>, AuthError> {
        self.with_timeout(self.resolver.fetch_profile(identity))
            .await
            .map_err(|e| match e {
                AuthError::ProfileResolutionFailure(_) => e,
                other => AuthError::ProfileResolutionFailure(other.to_string()),
            })
    }

    /// Resolve the profile for `identity` and apply it if `generation` is
    /// still current. Failures degrade to a signed-in session without profile.
    async fn resolve_profile(&self, generation: u64, identity: Identity) {
        let profile = match self.lookup_profile(&identity).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!("No profile found for {}", identity.user_id);
                None
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("Discarding stale profile for {}", identity.user_id);
            return;
        }
        inner.session.state = AuthState::Authenticated;
        inner.session.profile = profile;
        self.publish(&inner);
    }

    /// Adopt an identity obtained by an explicit operation and wait for the
    /// session to settle
    async fn complete_sign_in(&self, identity: Identity, epoch: u64) -> Result<Session, AuthError> {
        let token = identity.access_token.clone();
        let user_id = identity.user_id.clone();
        match self.adopt_identity(identity, Expect::SignoutEpoch(epoch)) {
            Adoption::Started(generation, identity) => {
                self.resolve_profile(generation, identity).await;
            }
            Adoption::InFlight | Adoption::Current => {}
            Adoption::Rejected => return self.cancel_sign_in(token).await,
        }

        let session = self.settled().await;
        if self.signout_epoch() != epoch {
            return self.cancel_sign_in(token).await;
        }
        let ours = session.is_authenticated()
            && session.identity.as_ref().map(|i| &i.user_id) == Some(&user_id);
        if !ours {
            info!("Another identity took over while signing in");
            return Err(AuthError::Cancelled);
        }
        Ok(session)
    }

    /// A sign-out happened while signing in: drop and revoke the new session
    async fn cancel_sign_in(&self, token: String) -> Result<Session, AuthError> {
        info!("Signed out while signing in, dropping the new session");
        // The backend may still announce this sign-in
        self.inner.lock().retired_token = Some(token);
        if let Err(e) = self.with_timeout(self.backend.sign_out()).await {
            warn!("Failed to revoke cancelled session: {}", e);
        }
        Err(AuthError::Cancelled)
    }

    /// Wait until no profile resolution is pending
    async fn settled(&self) -> Session {
        let mut rx = self.session_tx.subscribe();
        loop {
            let session = rx.borrow_and_update().clone();
            if session.state != AuthState::ResolvingProfile {
                return session;
            }
            if rx.changed().await.is_err() {
                return session;
            }
        }
    }

    async fn apply_signup_role(&self, role: Role) -> Session {
        let (generation, identity) = {
            let inner = self.inner.lock();
            let Some(identity) = inner.session.identity.clone() else {
                return inner.session.clone();
            };
            if matches!(inner.session.role(), Some(r) if r != Role::None) {
                info!("Profile already has a role, ignoring sign-up role '{}'", role);
                return inner.session.clone();
            }
            (inner.generation, identity)
        };

        match self
            .with_timeout(self.resolver.assign_role(&identity, role))
            .await
        {
            Ok(profile) => {
                let mut inner = self.inner.lock();
                if inner.generation == generation {
                    inner.session.profile = Some(profile);
                    self.publish(&inner);
                }
            }
            Err(e) => warn!("Could not apply sign-up role '{}': {}", role, e),
        }
        self.current_session()
    }

    async fn with_timeout<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::NetworkFailure(format!(
                "Request timed out after {}s",
                self.config.request_timeout.as_secs()
            ))),
        }
    }

    fn announce_signed_in(&self, session: &Session, greeting: &str) {
        let message = match (&session.profile, &session.identity) {
            (Some(profile), _) => format!("{}, {}!", greeting, profile.display_name),
            (None, Some(identity)) => format!(
                "{}, {}! Your profile could not be loaded yet.",
                greeting, identity.email
            ),
            (None, None) => greeting.to_string(),
        };
        let route = Route::landing_for(session);
        info!("Signed in, redirecting to {}", route);
        self.notifier.notify(Notice::success("Signed in", message));
        self.navigator.navigate(route);
    }

    fn report_failure(&self, title: &str, error: &AuthError) {
        warn!("{}: {}", title, error);
        self.notifier.notify(Notice::error(title, error.to_string()));
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::ValidationError("Please enter your name".to_string()));
    }
    let email = email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AuthError::ValidationError(
            "Please enter a valid e-mail address".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::ValidationError(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if role == Role::None {
        return Err(AuthError::ValidationError("Please choose a role".to_string()));
    }
    Ok(())
}
