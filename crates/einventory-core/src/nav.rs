//! Console locations and the guarded router.
//!
//! Every navigation goes through `AccessGate::admit`. Redirects replace the
//! current history entry, so stepping back can never land on a location the
//! gate refused.

use tracing::debug;

use crate::auth::{AccessGate, Admission, SessionState};

/// Upper bound on chained redirects while resolving one navigation.
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Root,
    Login,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    Inventory,
    Devices,
    Sites,
    Services,
    Users,
    Records,
    History,
    Settings,
}

impl Location {
    /// Protected locations in navigation-menu order.
    pub const PROTECTED: [Location; 9] = [
        Location::Dashboard,
        Location::Inventory,
        Location::Devices,
        Location::Sites,
        Location::Services,
        Location::Users,
        Location::Records,
        Location::History,
        Location::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Location::Root => "/",
            Location::Login => "/login",
            Location::ForgotPassword => "/forgot-password",
            Location::ResetPassword => "/reset-password",
            Location::Dashboard => "/dashboard",
            Location::Inventory => "/inventory",
            Location::Devices => "/devices",
            Location::Sites => "/sedes",
            Location::Services => "/services",
            Location::Users => "/users",
            Location::Records => "/records",
            Location::History => "/history",
            Location::Settings => "/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        [Location::Root, Location::Login, Location::ForgotPassword, Location::ResetPassword]
            .into_iter()
            .chain(Self::PROTECTED)
            .find(|l| l.path() == normalized)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Location::Root => "Home",
            Location::Login => "Sign in",
            Location::ForgotPassword => "Forgot password",
            Location::ResetPassword => "Reset password",
            Location::Dashboard => "Dashboard",
            Location::Inventory => "Inventory",
            Location::Devices => "Devices",
            Location::Sites => "Sites",
            Location::Services => "Services",
            Location::Users => "Users",
            Location::Records => "Records",
            Location::History => "History",
            Location::Settings => "Settings",
        }
    }

    /// Reachable only with a session; gated as one group.
    pub fn is_protected(&self) -> bool {
        Self::PROTECTED.contains(self)
    }
}

/// Where the operator was headed when the gate sent them to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationIntent {
    pub from: Location,
}

/// History stack guarded by the access gate.
#[derive(Debug)]
pub struct Router {
    history: Vec<Location>,
    intent: Option<NavigationIntent>,
}

impl Router {
    /// Start at the root location and resolve it against `state`.
    pub fn new(state: &SessionState) -> Self {
        let mut router = Self {
            history: vec![Location::Root],
            intent: None,
        };
        router.resolve(state);
        router
    }

    pub fn current(&self) -> Location {
        self.history.last().copied().unwrap_or(Location::Root)
    }

    /// Push `to` and resolve redirects. Returns where the operator landed.
    pub fn navigate(&mut self, to: Location, state: &SessionState) -> Location {
        if to != self.current() {
            self.history.push(to);
        }
        self.resolve(state)
    }

    /// Pop one entry (never the last) and resolve.
    pub fn back(&mut self, state: &SessionState) -> Location {
        if self.history.len() > 1 {
            self.history.pop();
        }
        self.resolve(state)
    }

    /// Re-run the gate on the current location after the session changed.
    pub fn revalidate(&mut self, state: &SessionState) -> Location {
        self.resolve(state)
    }

    /// Last captured intent, if any. Taking it clears it.
    pub fn take_intent(&mut self) -> Option<NavigationIntent> {
        self.intent.take()
    }

    pub fn pending_intent(&self) -> Option<NavigationIntent> {
        self.intent
    }

    /// Send the operator to their captured intent, or the dashboard.
    pub fn complete_login(&mut self, state: &SessionState) -> Location {
        let target = self
            .take_intent()
            .map(|i| i.from)
            .unwrap_or(Location::Dashboard);
        self.navigate(target, state)
    }

    fn resolve(&mut self, state: &SessionState) -> Location {
        for _ in 0..MAX_REDIRECTS {
            let requested = self.current();
            match AccessGate::admit(requested, state) {
                Admission::Allow => break,
                Admission::Redirect { to, intent, replace } => {
                    debug!(from = requested.path(), to = to.path(), "Redirecting");
                    if intent.is_some() {
                        self.intent = intent;
                    }
                    if replace {
                        self.history.pop();
                    }
                    if self.history.last() != Some(&to) {
                        self.history.push(to);
                    }
                }
            }
        }
        self.current()
    }
}
