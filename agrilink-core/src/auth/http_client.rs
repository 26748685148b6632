//! HTTP client for the Supabase auth and REST APIs

use super::backend::{CredentialBackend, ProfileResolver};
use super::oauth::{self, PkcePair};
use super::storage::SessionStorage;
use super::types::{
    AuthChange, AuthChangeEvent, AuthError, Identity, OAuthProvider, Profile, ProfileRow, Role,
    SignUpMetadata, SupabaseAuthResponse, SupabaseUser,
};
use crate::settings::AppSettings;
use crate::utils::{open_url, redact};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

const USER_AGENT: &str = concat!("AgriLink/", env!("CARGO_PKG_VERSION"));
const PROFILES_TABLE: &str = "profiles";
const EVENT_CAPACITY: usize = 16;

/// Supabase-backed credential backend and profile resolver
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    storage: Arc<SessionStorage>,
    events: broadcast::Sender<AuthChange>,
    /// Verifier for the OAuth flow currently waiting on its redirect
    pkce_verifier: Mutex<Option<String>>,
}

impl SupabaseClient {
    pub fn new(settings: &AppSettings, storage: Arc<SessionStorage>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| AuthError::NetworkFailure(format!("Failed to create HTTP client: {}", e)))?;

        if settings.supabase_anon_key.is_empty() {
            warn!("Supabase anon key is empty, requests will be rejected");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
            anon_key: settings.supabase_anon_key.clone(),
            storage,
            events,
            pkce_verifier: Mutex::new(None),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
    }

    fn with_user(&self, request: RequestBuilder, identity: &Identity) -> RequestBuilder {
        self.with_key(request)
            .header("Authorization", format!("Bearer {}", identity.access_token))
    }

    async fn send(request: RequestBuilder) -> Result<Response, AuthError> {
        request
            .send()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))
    }

    /// Split a response into success or `(status, body)`
    async fn check(response: Response) -> Result<Response, (StatusCode, String)> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err((status, body))
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        response
            .json()
            .await
            .map_err(|e| AuthError::Backend(format!("Failed to parse response: {}", e)))
    }

    /// Persist, remember and announce a freshly issued identity
    fn adopt(&self, identity: Identity, event: AuthChangeEvent) -> Identity {
        if let Err(e) = self.storage.store(&identity) {
            warn!("Failed to persist session (continuing in memory): {}", e);
        }
        self.emit(event, Some(identity.clone()));
        identity
    }

    fn emit(&self, event: AuthChangeEvent, identity: Option<Identity>) {
        // No receivers is fine: nobody is listening yet
        let _ = self.events.send(AuthChange::new(event, identity));
    }

    /// Exchange the refresh token for a new identity
    pub async fn refresh_session(&self, identity: &Identity) -> Result<Identity, AuthError> {
        debug!("Refreshing token for {}", identity.email);

        let request = self
            .with_key(self.client.post(self.auth_url("token?grant_type=refresh_token")))
            .json(&json!({ "refresh_token": identity.refresh_token }));

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| {
                error!("Refresh token failed: {} - {}", status, body);
                if is_refresh_token_permanently_invalid(&body) {
                    AuthError::RefreshTokenInvalid
                } else {
                    classify_failure(status, &body)
                }
            })?;

        let data: SupabaseAuthResponse = Self::parse(response).await?;
        info!("Token refresh successful");
        Ok(self.adopt(data.into_identity(&identity.email), AuthChangeEvent::TokenRefreshed))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<SupabaseUser, AuthError> {
        let request = self
            .with_key(self.client.get(self.auth_url("user")))
            .header("Authorization", format!("Bearer {}", access_token));
        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| classify_failure(status, &body))?;
        Self::parse(response).await
    }
}

#[async_trait]
impl CredentialBackend for SupabaseClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        debug!("Signing in user: {}", email);

        let request = self
            .with_key(self.client.post(self.auth_url("token?grant_type=password")))
            .json(&json!({
                "email": email,
                "password": password,
            }));

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| {
                error!("Sign in failed: {} - {}", status, body);
                classify_failure(status, &body)
            })?;

        let data: SupabaseAuthResponse = Self::parse(response).await?;
        info!("Sign in successful for user {}", data.user.id);
        Ok(self.adopt(data.into_identity(email), AuthChangeEvent::SignedIn))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Identity>, AuthError> {
        debug!("Registering user: {} as {}", email, metadata.role);

        let request = self
            .with_key(self.client.post(self.auth_url("signup")))
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }));

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| {
                error!("Sign up failed: {} - {}", status, body);
                classify_failure(status, &body)
            })?;

        let body: serde_json::Value = Self::parse(response).await?;

        if body.get("access_token").is_some() {
            let data: SupabaseAuthResponse = serde_json::from_value(body)
                .map_err(|e| AuthError::Backend(format!("Failed to parse response: {}", e)))?;
            info!("Sign up successful for user {}", data.user.id);
            return Ok(Some(self.adopt(data.into_identity(email), AuthChangeEvent::SignedIn)));
        }

        // Confirmation flow: only the user object comes back
        let user_value = body.get("user").cloned().unwrap_or(body);
        let user: SupabaseUser = serde_json::from_value(user_value)
            .map_err(|e| AuthError::Backend(format!("Failed to parse response: {}", e)))?;

        if user.identities.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Err(AuthError::ValidationError(
                "User already registered".to_string(),
            ));
        }

        info!("Sign up for {} awaits e-mail confirmation", user.id);
        Ok(None)
    }

    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        let pkce = PkcePair::generate();
        let url = oauth::authorize_url(&self.base_url, provider, redirect_to, &pkce.challenge)?;

        info!("Opening browser for {} sign-in", provider.as_str());
        open_url(&url)
            .map_err(|e| AuthError::OAuthFailure(format!("Could not open browser: {}", e)))?;

        *self.pkce_verifier.lock() = Some(pkce.verifier);
        Ok(url)
    }

    async fn exchange_oauth_callback(&self, callback_url: &str) -> Result<Identity, AuthError> {
        let code = oauth::parse_callback(callback_url)?;
        let verifier = self.pkce_verifier.lock().take().ok_or_else(|| {
            AuthError::OAuthFailure("No sign-in in progress. Please start again.".to_string())
        })?;

        debug!("Exchanging auth code {}", redact(&code));

        let request = self
            .with_key(self.client.post(self.auth_url("token?grant_type=pkce")))
            .json(&json!({
                "auth_code": code,
                "code_verifier": verifier,
            }));

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| {
                error!("Code exchange failed: {} - {}", status, body);
                AuthError::OAuthFailure(format!("Code exchange failed ({})", status))
            })?;

        let data: SupabaseAuthResponse = Self::parse(response).await?;
        let mut identity = data.into_identity("");
        if identity.email.is_empty() {
            identity.email = self
                .fetch_user(&identity.access_token)
                .await?
                .email
                .unwrap_or_default();
        }

        info!("OAuth sign-in successful for user {}", identity.user_id);
        Ok(self.adopt(identity, AuthChangeEvent::SignedIn))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let current = self.storage.load();

        self.storage.clear();
        *self.pkce_verifier.lock() = None;
        self.emit(AuthChangeEvent::SignedOut, None);

        let Some(identity) = current else {
            debug!("No stored session, nothing to revoke");
            return Ok(());
        };

        let request = self.with_user(self.client.post(self.auth_url("logout")), &identity);
        match Self::check(Self::send(request).await?).await {
            Ok(_) => {
                info!("Session revoked on server");
                Ok(())
            }
            // Already gone on the server side
            Err((StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND, _)) => Ok(()),
            Err((status, body)) => Err(classify_failure(status, &body)),
        }
    }

    async fn get_session(&self) -> Result<Option<Identity>, AuthError> {
        let Some(identity) = self.storage.load() else {
            return Ok(None);
        };

        if !identity.expires_soon() {
            return Ok(Some(identity));
        }

        info!("Stored token expires soon, refreshing");
        match self.refresh_session(&identity).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::RefreshTokenInvalid) => {
                warn!("Refresh token is permanently invalid, clearing session");
                self.storage.clear();
                self.emit(AuthChangeEvent::SignedOut, None);
                Ok(None)
            }
            // Still usable for a few minutes
            Err(e) if !identity.is_expired() => {
                warn!("Refresh failed but token not yet expired: {}", e);
                Ok(Some(identity))
            }
            Err(e) => Err(e),
        }
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl ProfileResolver for SupabaseClient {
    async fn fetch_profile(&self, identity: &Identity) -> Result<Option<Profile>, AuthError> {
        debug!("Fetching profile for {}", identity.user_id);

        let request = self
            .with_user(self.client.get(self.rest_url(PROFILES_TABLE)), identity)
            .query(&[("id", format!("eq.{}", identity.user_id)), ("select", "*".to_string())]);

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| {
                AuthError::ProfileResolutionFailure(format!("{} - {}", status, body))
            })?;

        let rows: Vec<ProfileRow> = Self::parse(response).await?;
        Ok(rows.into_iter().next().map(|row| row.into_profile(identity)))
    }

    async fn assign_role(&self, identity: &Identity, role: Role) -> Result<Profile, AuthError> {
        info!("Assigning role '{}' to {}", role, identity.user_id);

        let request = self
            .with_user(self.client.patch(self.rest_url(PROFILES_TABLE)), identity)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", identity.user_id))])
            .json(&json!({ "role": role }));

        let response = Self::check(Self::send(request).await?)
            .await
            .map_err(|(status, body)| classify_failure(status, &body))?;

        let rows: Vec<ProfileRow> = Self::parse(response).await?;
        rows.into_iter()
            .next()
            .map(|row| row.into_profile(identity))
            .ok_or_else(|| AuthError::Backend("Profile not found".to_string()))
    }
}

/// Map a failed auth response to the error taxonomy
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> AuthError {
    let lower = body.to_ascii_lowercase();

    if lower.contains("invalid login credentials") || lower.contains("invalid_credentials") {
        return AuthError::InvalidCredentials;
    }
    if lower.contains("already registered") || lower.contains("user_already_exists") {
        return AuthError::ValidationError("User already registered".to_string());
    }
    if status == StatusCode::UNPROCESSABLE_ENTITY
        || lower.contains("weak_password")
        || lower.contains("validation_failed")
    {
        return AuthError::ValidationError(extract_message(body).unwrap_or_else(|| {
            format!("Request rejected ({})", status)
        }));
    }
    if status.is_server_error() {
        return AuthError::NetworkFailure(format!("Server error ({})", status));
    }

    AuthError::Backend(
        extract_message(body).unwrap_or_else(|| format!("Request failed ({})", status)),
    )
}

/// Pull a human-readable message out of a GoTrue/PostgREST error body
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Classify a Supabase refresh-token error response body.
///
/// Returns `true` if the error indicates a permanently invalid refresh token
/// (revoked, rotated, or not found). These errors should NOT be retried.
pub(crate) fn is_refresh_token_permanently_invalid(body: &str) -> bool {
    body.contains("refresh_token_not_found")
        || body.contains("Invalid Refresh Token")
        || body.contains("refresh_token_already_used")
}
