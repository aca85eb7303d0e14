use crate::nav::{Location, NavigationIntent};

use super::SessionState;

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Redirect {
        to: Location,
        intent: Option<NavigationIntent>,
        /// Replace the current history entry instead of pushing.
        replace: bool,
    },
}

/// Route guard for the console.
pub struct AccessGate;

impl AccessGate {
    /// Decide whether `request` may be shown for `state`.
    ///
    /// Protected locations need a token; without one the operator is sent to
    /// the login view and the requested location is kept as intent. The root
    /// location forwards to the dashboard, which is gated in turn; the login
    /// view forwards there too once a session exists.
    pub fn admit(request: Location, state: &SessionState) -> Admission {
        let authenticated = state.is_authenticated();
        match request {
            Location::Root => Admission::Redirect {
                to: Location::Dashboard,
                intent: None,
                replace: true,
            },
            Location::Login if authenticated => Admission::Redirect {
                to: Location::Dashboard,
                intent: None,
                replace: true,
            },
            Location::Login | Location::ForgotPassword | Location::ResetPassword => Admission::Allow,
            protected if authenticated => {
                debug_assert!(protected.is_protected());
                Admission::Allow
            }
            protected => Admission::Redirect {
                to: Location::Login,
                intent: Some(NavigationIntent { from: protected }),
                replace: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;

    fn with_token() -> SessionState {
        SessionState {
            token: Token::new("tok123"),
            profile: None,
        }
    }

    #[test]
    fn test_protected_without_token_redirects_with_intent() {
        for location in Location::PROTECTED {
            assert_eq!(
                AccessGate::admit(location, &SessionState::default()),
                Admission::Redirect {
                    to: Location::Login,
                    intent: Some(NavigationIntent { from: location }),
                    replace: true,
                }
            );
        }
    }

    #[test]
    fn test_protected_with_token_is_allowed() {
        for location in Location::PROTECTED {
            assert_eq!(AccessGate::admit(location, &with_token()), Admission::Allow);
        }
    }

    #[test]
    fn test_root_forwards_to_dashboard() {
        for state in [SessionState::default(), with_token()] {
            assert_eq!(
                AccessGate::admit(Location::Root, &state),
                Admission::Redirect {
                    to: Location::Dashboard,
                    intent: None,
                    replace: true,
                }
            );
        }
    }

    #[test]
    fn test_login_view_when_already_signed_in() {
        assert_eq!(AccessGate::admit(Location::Login, &SessionState::default()), Admission::Allow);
        assert!(matches!(
            AccessGate::admit(Location::Login, &with_token()),
            Admission::Redirect { to: Location::Dashboard, .. }
        ));
    }

    #[test]
    fn test_recovery_pages_are_public() {
        assert_eq!(
            AccessGate::admit(Location::ResetPassword, &SessionState::default()),
            Admission::Allow
        );
        assert_eq!(AccessGate::admit(Location::ForgotPassword, &with_token()), Admission::Allow);
    }
}
