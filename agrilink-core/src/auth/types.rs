//! Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace role attached to a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Landowner,
    Corporate,
    /// Signed up but no role chosen yet
    #[default]
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Landowner => "landowner",
            Role::Corporate => "corporate",
            Role::None => "none",
        }
    }

    /// Lenient mapping for values coming back from the database.
    /// Anything unrecognised is treated as "no role".
    pub fn from_db(value: Option<&str>) -> Role {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Role::None)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "landowner" => Ok(Role::Landowner),
            "corporate" => Ok(Role::Corporate),
            "none" | "" => Ok(Role::None),
            other => Err(AuthError::ValidationError(format!(
                "Unknown role '{}'",
                other
            ))),
        }
    }
}

/// Role-bearing user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Identity issued by the credential backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// Check if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the token will expire soon (within 5 minutes)
    pub fn expires_soon(&self) -> bool {
        Utc::now() + chrono::Duration::minutes(5) >= self.expires_at
    }

    /// Same user, regardless of which tokens are attached
    pub fn same_user(&self, other: &Identity) -> bool {
        self.user_id == other.user_id
    }
}

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    /// A login/register/OAuth call is in flight
    AuthenticatingCredentials,
    /// Identity obtained, profile lookup in flight
    ResolvingProfile,
    /// Identity present; profile present unless resolution failed
    Authenticated,
}

/// Coarse loading indicator for pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    ResolvingProfile,
    Ready,
}

/// The single source of truth for who is using the app right now
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub state: AuthState,
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
}

impl Session {
    pub(crate) fn authenticating() -> Self {
        Self {
            state: AuthState::AuthenticatingCredentials,
            identity: None,
            profile: None,
        }
    }

    pub(crate) fn resolving(identity: Identity) -> Self {
        Self {
            state: AuthState::ResolvingProfile,
            identity: Some(identity),
            profile: None,
        }
    }

    pub fn loading_state(&self) -> LoadingState {
        match self.state {
            AuthState::ResolvingProfile => LoadingState::ResolvingProfile,
            AuthState::Authenticated => LoadingState::Ready,
            AuthState::Unauthenticated | AuthState::AuthenticatingCredentials => {
                LoadingState::Idle
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Signed in, but the profile could not be resolved
    pub fn is_degraded(&self) -> bool {
        self.is_authenticated() && self.profile.is_none()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.user_id.as_str())
    }
}

/// Kind of upstream auth notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Event delivered by the credential backend subscription
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    pub identity: Option<Identity>,
}

impl AuthChange {
    pub fn new(event: AuthChangeEvent, identity: Option<Identity>) -> Self {
        Self { event, identity }
    }
}

/// Metadata attached to a sign-up so the database trigger can create the profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpMetadata {
    pub full_name: String,
    pub role: Role,
}

/// Supported OAuth providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }
}

/// Result of a successful registration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Account created and signed in
    SignedIn,
    /// Account created, e-mail confirmation pending before first sign-in
    ConfirmationRequired,
}

/// Supabase auth response
#[derive(Debug, Deserialize)]
pub struct SupabaseAuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub user: SupabaseUser,
}

impl SupabaseAuthResponse {
    pub fn into_identity(self, fallback_email: &str) -> Identity {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in));
        Identity {
            user_id: self.user.id,
            email: self.user.email.unwrap_or_else(|| fallback_email.to_string()),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Supabase user from auth response
#[derive(Debug, Deserialize)]
pub struct SupabaseUser {
    pub id: String,
    pub email: Option<String>,
    /// Linked provider identities. Supabase returns an empty list when
    /// signing up an address that is already registered.
    #[serde(default)]
    pub identities: Option<Vec<serde_json::Value>>,
}

/// Row of the `profiles` table
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileRow {
    pub fn into_profile(self, identity: &Identity) -> Profile {
        let email = self.email.unwrap_or_else(|| identity.email.clone());
        let display_name = self
            .full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        Profile {
            id: self.id,
            display_name,
            email,
            role: Role::from_db(self.role.as_deref()),
            phone: self.phone,
            photo_url: self.avatar_url,
        }
    }
}

/// Error types for authentication
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Google sign-in failed: {0}")]
    OAuthFailure(String),

    #[error("Could not load profile: {0}")]
    ProfileResolutionFailure(String),

    #[error("{0}")]
    Backend(String),

    #[error("Another sign-in is already in progress")]
    OperationInProgress,

    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Session expired, please sign in again")]
    RefreshTokenInvalid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_identity(expires_at: DateTime<Utc>) -> Identity {
        Identity {
            user_id: "user-1".to_string(),
            email: "test@example.com".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_identity_is_expired_when_past() {
        let identity = make_identity(Utc::now() - Duration::hours(1));
        assert!(identity.is_expired());
    }

    #[test]
    fn test_identity_expires_soon_when_less_than_5_min() {
        let identity = make_identity(Utc::now() + Duration::minutes(3));
        assert!(identity.expires_soon());
        assert!(!identity.is_expired());
    }

    #[test]
    fn test_identity_not_expires_soon_when_more_than_5_min() {
        let identity = make_identity(Utc::now() + Duration::minutes(10));
        assert!(!identity.expires_soon());
    }

    #[test]
    fn test_same_user_ignores_tokens() {
        let a = make_identity(Utc::now());
        let mut b = a.clone();
        b.access_token = "rotated".to_string();
        assert!(a.same_user(&b));
        b.user_id = "user-2".to_string();
        assert!(!a.same_user(&b));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("farmer".parse::<Role>().unwrap(), Role::Farmer);
        assert_eq!(" Landowner ".parse::<Role>().unwrap(), Role::Landowner);
        assert_eq!("CORPORATE".parse::<Role>().unwrap(), Role::Corporate);
        assert_eq!("".parse::<Role>().unwrap(), Role::None);
        assert!(matches!(
            "investor".parse::<Role>(),
            Err(AuthError::ValidationError(_))
        ));
    }

    #[test]
    fn test_role_from_db_is_lenient() {
        assert_eq!(Role::from_db(Some("farmer")), Role::Farmer);
        assert_eq!(Role::from_db(Some("admin")), Role::None);
        assert_eq!(Role::from_db(None), Role::None);
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Landowner).unwrap(), "\"landowner\"");
        let role: Role = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(role, Role::None);
    }

    #[test]
    fn test_session_default_is_unauthenticated() {
        let session = Session::default();
        assert_eq!(session.state, AuthState::Unauthenticated);
        assert_eq!(session.loading_state(), LoadingState::Idle);
        assert!(session.identity.is_none());
    }

    #[test]
    fn test_session_loading_state_follows_lifecycle() {
        let identity = make_identity(Utc::now() + Duration::hours(1));
        let mut session = Session::resolving(identity);
        assert_eq!(session.loading_state(), LoadingState::ResolvingProfile);
        session.state = AuthState::Authenticated;
        assert_eq!(session.loading_state(), LoadingState::Ready);
        assert!(session.is_degraded());
        assert_eq!(Session::authenticating().loading_state(), LoadingState::Idle);
    }

    #[test]
    fn test_auth_response_into_identity() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "expires_at": 1900000000,
            "token_type": "bearer",
            "user": {"id": "uid-1", "email": null}
        }"#;
        let resp: SupabaseAuthResponse = serde_json::from_str(json).unwrap();
        let identity = resp.into_identity("fallback@example.com");
        assert_eq!(identity.user_id, "uid-1");
        assert_eq!(identity.email, "fallback@example.com");
        assert_eq!(identity.expires_at.timestamp(), 1900000000);
    }

    #[test]
    fn test_profile_row_into_profile() {
        let identity = make_identity(Utc::now());
        let json = r#"{"id": "user-1", "full_name": "  ", "role": "corporate", "avatar_url": "https://img/x.png"}"#;
        let row: ProfileRow = serde_json::from_str(json).unwrap();
        let profile = row.into_profile(&identity);
        assert_eq!(profile.display_name, "test");
        assert_eq!(profile.email, "test@example.com");
        assert_eq!(profile.role, Role::Corporate);
        assert_eq!(profile.photo_url.as_deref(), Some("https://img/x.png"));
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::NetworkFailure("timeout".to_string()).to_string(),
            "Network error: timeout"
        );
        assert_eq!(
            AuthError::ValidationError("User already registered".to_string()).to_string(),
            "User already registered"
        );
        assert_eq!(
            AuthError::RefreshTokenInvalid.to_string(),
            "Session expired, please sign in again"
        );
    }
}
