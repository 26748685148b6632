//! Routes the session can send the user to, and the role-based guard

use crate::auth::types::{Role, Session};
use log::debug;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public marketing page
    Landing,
    Login,
    /// Signed in but no role yet
    Onboarding,
    Dashboard(Role),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::Onboarding => "/onboarding",
            Route::Dashboard(Role::Farmer) => "/farmer/dashboard",
            Route::Dashboard(Role::Landowner) => "/landowner/dashboard",
            Route::Dashboard(Role::Corporate) => "/corporate/dashboard",
            Route::Dashboard(Role::None) => "/onboarding",
        }
    }

    /// Authenticated landing area for a session
    pub fn landing_for(session: &Session) -> Route {
        if !session.is_authenticated() {
            return Route::Login;
        }
        match session.role() {
            Some(role) if role != Role::None => Route::Dashboard(role),
            _ => Route::Onboarding,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives redirect side effects
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless use: records the redirect in the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        debug!("Redirect to {}", route);
    }
}

impl Session {
    /// Route guard: role dashboards need an authenticated session with that role
    pub fn can_access(&self, route: &Route) -> bool {
        match route {
            Route::Landing | Route::Login => true,
            Route::Onboarding => self.is_authenticated(),
            Route::Dashboard(role) => {
                *role != Role::None && self.is_authenticated() && self.role() == Some(*role)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{AuthState, Identity, Profile};
    use chrono::Utc;

    fn session_with(role: Option<Role>) -> Session {
        Session {
            state: AuthState::Authenticated,
            identity: Some(Identity {
                user_id: "u1".to_string(),
                email: "a@example.com".to_string(),
                access_token: "at".to_string(),
                refresh_token: "rt".to_string(),
                expires_at: Utc::now(),
            }),
            profile: role.map(|role| Profile {
                id: "u1".to_string(),
                display_name: "A".to_string(),
                email: "a@example.com".to_string(),
                role,
                phone: None,
                photo_url: None,
            }),
        }
    }

    #[test]
    fn test_landing_for_roles() {
        assert_eq!(
            Route::landing_for(&session_with(Some(Role::Farmer))),
            Route::Dashboard(Role::Farmer)
        );
        assert_eq!(
            Route::landing_for(&session_with(Some(Role::None))),
            Route::Onboarding
        );
        // Degraded: signed in, profile unknown
        assert_eq!(Route::landing_for(&session_with(None)), Route::Onboarding);
        assert_eq!(Route::landing_for(&Session::default()), Route::Login);
    }

    #[test]
    fn test_guard() {
        let farmer = session_with(Some(Role::Farmer));
        assert!(farmer.can_access(&Route::Dashboard(Role::Farmer)));
        assert!(!farmer.can_access(&Route::Dashboard(Role::Corporate)));
        assert!(farmer.can_access(&Route::Landing));

        let anonymous = Session::default();
        assert!(!anonymous.can_access(&Route::Dashboard(Role::Farmer)));
        assert!(!anonymous.can_access(&Route::Onboarding));
        assert!(anonymous.can_access(&Route::Login));

        let degraded = session_with(None);
        assert!(degraded.can_access(&Route::Onboarding));
        assert!(!degraded.can_access(&Route::Dashboard(Role::None)));
    }

    #[test]
    fn test_paths() {
        assert_eq!(Route::Dashboard(Role::Landowner).to_string(), "/landowner/dashboard");
        assert_eq!(Route::Landing.path(), "/");
    }
}
