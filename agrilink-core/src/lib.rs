//! AgriLink Core Library
//!
//! Session lifecycle, Supabase authentication, role-based routing and
//! settings for the AgriLink marketplace. Front ends attach a notifier and
//! a navigator and read the session from [`SessionManager`].

pub mod auth;
pub mod navigation;
pub mod notification;
pub mod settings;
pub mod utils;

// Re-export commonly used items
pub use auth::{
    AuthError, AuthState, Identity, Profile, RegisterOutcome, Role, Session, SessionConfig,
    SessionManager,
};
pub use navigation::{Navigator, Route};
pub use notification::{Notice, NoticeLevel, Notifier};
pub use settings::{
    AppSettings, get_settings_path, load_settings, load_settings_from, save_settings,
};
pub use utils::open_url;
