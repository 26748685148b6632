//! Redirect-based OAuth helpers: PKCE, authorize URLs, callback parsing and
//! the pending sign-up role that has to survive the round trip.

use super::types::{AuthError, OAuthProvider, Role};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rand::Rng;
use sha2::{Digest, Sha256};
use url::Url;

/// How long a sign-up role waits for the provider to send the user back
pub const PENDING_ROLE_TTL_MINUTES: i64 = 10;

const VERIFIER_LEN: usize = 64;

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(VERIFIER_LEN)
            .map(char::from)
            .collect();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// S256 code challenge (RFC 7636)
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Provider authorize URL on the auth server
pub fn authorize_url(
    supabase_url: &str,
    provider: OAuthProvider,
    redirect_to: &str,
    challenge: &str,
) -> Result<String, AuthError> {
    let base = format!("{}/auth/v1/authorize", supabase_url.trim_end_matches('/'));
    let url = Url::parse_with_params(
        &base,
        &[
            ("provider", provider.as_str()),
            ("redirect_to", redirect_to),
            ("code_challenge", challenge),
            ("code_challenge_method", "s256"),
        ],
    )
    .map_err(|e| AuthError::OAuthFailure(format!("Invalid auth URL: {}", e)))?;
    Ok(url.into())
}

/// Extract the authorization code from the URL the provider redirected to.
///
/// Errors reported by the provider arrive either in the query or in the
/// fragment, depending on where the flow failed.
pub fn parse_callback(callback_url: &str) -> Result<String, AuthError> {
    let url = Url::parse(callback_url)
        .map_err(|e| AuthError::OAuthFailure(format!("Malformed callback URL: {}", e)))?;

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        params.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    if let Some(error) = get("error") {
        let description = get("error_description").unwrap_or(error);
        return Err(AuthError::OAuthFailure(description));
    }

    get("code")
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::OAuthFailure("Callback did not include a code".to_string()))
}

#[derive(Debug, Clone)]
struct PendingRole {
    role: Role,
    started_at: DateTime<Utc>,
}

/// Role chosen before an OAuth sign-up redirect.
///
/// Process-local and deliberately outside the session: it only matters
/// until the redirect completes.
#[derive(Debug, Default)]
pub struct PendingSignup {
    slot: Mutex<Option<PendingRole>>,
}

impl PendingSignup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, role: Role) {
        info!("Remembering role '{}' for OAuth sign-up", role);
        *self.slot.lock() = Some(PendingRole {
            role,
            started_at: Utc::now(),
        });
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Take the role if it has not expired
    pub fn take(&self) -> Option<Role> {
        self.take_at(Utc::now())
    }

    fn take_at(&self, now: DateTime<Utc>) -> Option<Role> {
        let pending = self.slot.lock().take()?;
        if now - pending.started_at > Duration::minutes(PENDING_ROLE_TTL_MINUTES) {
            debug!("Pending sign-up role expired, ignoring it");
            return None;
        }
        Some(pending.role)
    }
}
