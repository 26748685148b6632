//! Authentication for AgriLink
//!
//! ## Architecture
//!
//! - types.rs: roles, identities, the session value and the error taxonomy
//! - backend.rs: credential backend and profile resolver seams
//! - http_client.rs: Supabase GoTrue/PostgREST implementation of both seams
//! - oauth.rs: PKCE, callback parsing, pending sign-up role
//! - storage.rs: persisted session (obfuscated file, keyring fallback)
//! - manager.rs: the session manager every page reads from

pub mod backend;
pub mod http_client;
pub mod manager;
pub mod oauth;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::{CredentialBackend, ProfileResolver};
pub use http_client::SupabaseClient;
pub use manager::{SessionConfig, SessionManager};
pub use storage::SessionStorage;
pub use types::{
    AuthChange, AuthChangeEvent, AuthError, AuthState, Identity, LoadingState, OAuthProvider,
    Profile, RegisterOutcome, Role, Session,
};
