//! Collaborator seams used by the session manager

use super::types::{AuthChange, AuthError, Identity, OAuthProvider, Profile, Role, SignUpMetadata};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Issues and revokes identities
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Identity, AuthError>;

    /// Returns `None` when the account was created but must be confirmed
    /// by e-mail before a session is issued.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Identity>, AuthError>;

    /// Sends the user agent to the provider. Returns the URL that was opened.
    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError>;

    /// Completes a redirect flow from the URL the provider sent the user back to
    async fn exchange_oauth_callback(&self, callback_url: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Currently persisted identity, refreshed if its token has expired
    async fn get_session(&self) -> Result<Option<Identity>, AuthError>;

    /// Upstream auth-change stream. Dropping the receiver unsubscribes.
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthChange>;
}

/// Maps identities to role-bearing profiles
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// `Ok(None)` when no profile row exists for the identity
    async fn fetch_profile(&self, identity: &Identity) -> Result<Option<Profile>, AuthError>;

    async fn assign_role(&self, identity: &Identity, role: Role) -> Result<Profile, AuthError>;
}
