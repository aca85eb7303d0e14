//! The session context: single owner of authentication state.
//!
//! `SessionContext` is a cheap-to-clone handle. Every clone refers to the
//! same state, and `set_token` is the only way that state changes. Readers
//! either take a snapshot or `subscribe()` to a watch channel that sees each
//! write as soon as `set_token` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, IdentityService, Profile};

use super::{ProfileFetcher, Token, TokenStore};

/// Authoritative `{token, profile}` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub token: Option<Token>,
    pub profile: Option<Profile>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Everything that must change together under the writer lock.
struct Writer {
    store: Box<dyn TokenStore>,
    /// Bumped on every token change; profile results carry the value they
    /// were issued under.
    generation: u64,
}

struct Inner {
    state: watch::Sender<SessionState>,
    writer: Mutex<Writer>,
    profiles: ProfileFetcher,
    monitor_armed: AtomicBool,
}

#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// Create the context, restoring any token left in `store`.
    ///
    /// A restored token schedules a profile fetch when called inside a tokio
    /// runtime.
    pub fn new(store: Box<dyn TokenStore>, identity: Arc<dyn IdentityService>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, starting logged out");
                None
            }
        };
        debug!(restored = token.is_some(), "Session context created");

        let (state, _) = watch::channel(SessionState {
            token: token.clone(),
            profile: None,
        });

        let ctx = Self {
            inner: Arc::new(Inner {
                state,
                writer: Mutex::new(Writer {
                    store,
                    generation: 0,
                }),
                profiles: ProfileFetcher::new(identity),
                monitor_armed: AtomicBool::new(false),
            }),
        };

        if let Some(token) = token {
            info!("Restored session from storage");
            ctx.schedule_profile_fetch(token, 0);
        }
        ctx
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn token(&self) -> Option<Token> {
        self.inner.state.borrow().token.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.borrow().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Replace the current token. `None` or a blank value logs out.
    ///
    /// The durable store is written before this returns. Moving to a new
    /// token clears the profile and schedules a fetch for it; moving to no
    /// token clears the profile in the same notification.
    pub fn set_token(&self, value: Option<String>) {
        let writer = self.lock_writer();
        self.replace_token(writer, value.and_then(Token::new));
    }

    /// Log out only if `token` is still the current token. Returns whether
    /// it was cleared.
    pub fn discard_token(&self, token: &Token) -> bool {
        let writer = self.lock_writer();
        if self.inner.state.borrow().token.as_ref() != Some(token) {
            debug!("Token already replaced, nothing to discard");
            return false;
        }
        self.replace_token(writer, None);
        true
    }

    fn replace_token(&self, mut writer: MutexGuard<'_, Writer>, next: Option<Token>) {
        let persisted = match &next {
            Some(token) => writer.store.save(token),
            None => writer.store.clear(),
        };
        if let Err(e) = persisted {
            error!(error = %e, "Failed to persist session token");
        }

        let unchanged = self.inner.state.borrow().token == next;
        if unchanged {
            debug!(authenticated = next.is_some(), "Token unchanged");
            return;
        }

        writer.generation += 1;
        let generation = writer.generation;
        self.inner.state.send_modify(|state| {
            state.token = next.clone();
            state.profile = None;
        });
        drop(writer);

        match next {
            Some(token) => {
                info!(generation, "Session token set");
                self.schedule_profile_fetch(token, generation);
            }
            None => info!(generation, "Session token cleared"),
        }
    }

    /// Explicit logout from the console.
    pub fn logout(&self) {
        info!("Logging out");
        self.set_token(None);
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer> {
        self.inner.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn schedule_profile_fetch(&self, token: Token, generation: u64) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, profile fetch skipped");
            return;
        };

        let fetcher = self.inner.profiles.clone();
        let session: Weak<Inner> = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            let result = fetcher.fetch(&token).await;
            match session.upgrade() {
                Some(inner) => SessionContext { inner }.apply_profile(&token, generation, result),
                None => debug!("Session gone before profile arrived"),
            }
        });
    }

    /// Apply a profile result if the token it was fetched for is still the
    /// current one.
    fn apply_profile(&self, token: &Token, generation: u64, result: Result<Profile, ApiError>) {
        let writer = self.lock_writer();
        let current = {
            let state = self.inner.state.borrow();
            writer.generation == generation && state.token.as_ref() == Some(token)
        };
        if !current {
            debug!(generation, latest = writer.generation, "Discarding profile for superseded token");
            return;
        }

        match result {
            Ok(profile) => {
                self.inner.state.send_modify(|state| state.profile = Some(profile));
            }
            Err(_) => {
                // Not grounds for logout; the profile simply stays absent.
                self.inner.state.send_if_modified(|state| state.profile.take().is_some());
            }
        }
    }

    /// Claim the single inactivity monitor slot.
    pub(crate) fn claim_monitor(&self) -> bool {
        self.inner
            .monitor_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_monitor(&self) {
        self.inner.monitor_armed.store(false, Ordering::Release);
    }
}
