//! Inactivity monitor: closes the session after a window with no input.
//!
//! Activation returns an `InactivityGuard`. The countdown task and the
//! activity listener live exactly as long as the guard; dropping it on any
//! path cancels both. Only one guard can exist per `SessionContext`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::nav::Location;

use super::SessionContext;

/// Input the console reports as operator activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PointerMove,
    KeyPress,
    Scroll,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Countdown running.
    Armed,
    /// Window elapsed and the session was closed. Terminal for this arming.
    IdleTriggered,
}

/// Notifications the monitor sends back to the console loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    InactivityLogout {
        navigate_to: Location,
        /// Whether a token was present when the window elapsed.
        was_authenticated: bool,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MonitorError {
    #[error("An inactivity monitor is already armed for this session")]
    AlreadyActive,

    #[error("Inactivity monitor needs a running async runtime")]
    NoRuntime,
}

pub struct InactivityMonitor {
    session: SessionContext,
    window: Duration,
}

impl InactivityMonitor {
    pub fn new(session: SessionContext, window: Duration) -> Self {
        Self { session, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the countdown. Fails if another guard for the same session is
    /// still alive.
    pub fn activate(&self, events: mpsc::Sender<SessionEvent>) -> Result<InactivityGuard, MonitorError> {
        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        if !self.session.claim_monitor() {
            warn!("Refusing to arm a second inactivity monitor");
            return Err(MonitorError::AlreadyActive);
        }

        let activity = Arc::new(Notify::new());
        let (state_tx, state_rx) = watch::channel(MonitorState::Armed);
        let task = runtime.spawn(countdown(
            self.session.clone(),
            self.window,
            Arc::clone(&activity),
            state_tx,
            events,
        ));

        debug!(window_secs = self.window.as_secs(), "Inactivity monitor armed");
        Ok(InactivityGuard {
            session: self.session.clone(),
            activity,
            state: state_rx,
            task,
        })
    }
}

async fn countdown(
    session: SessionContext,
    window: Duration,
    activity: Arc<Notify>,
    state: watch::Sender<MonitorState>,
    events: mpsc::Sender<SessionEvent>,
) {
    loop {
        tokio::select! {
            biased;
            _ = activity.notified() => trace!("Activity, countdown restarted"),
            _ = tokio::time::sleep(window) => break,
        }
    }

    state.send_replace(MonitorState::IdleTriggered);
    let was_authenticated = session.is_authenticated();
    if was_authenticated {
        info!(window_secs = window.as_secs(), "Session closed due to inactivity");
    } else {
        debug!("Inactivity window elapsed with no session");
    }
    session.set_token(None);

    let event = SessionEvent::InactivityLogout {
        navigate_to: Location::Root,
        was_authenticated,
    };
    if events.send(event).await.is_err() {
        debug!("Console loop gone, inactivity logout not delivered");
    }
}

/// Live arming of the inactivity monitor.
pub struct InactivityGuard {
    session: SessionContext,
    activity: Arc<Notify>,
    state: watch::Receiver<MonitorState>,
    task: JoinHandle<()>,
}

impl InactivityGuard {
    /// Report operator input. Ignored once the monitor has fired.
    pub fn record(&self, kind: ActivityKind) {
        if *self.state.borrow() == MonitorState::Armed {
            trace!(?kind, "Activity recorded");
            self.activity.notify_one();
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }
}

impl Drop for InactivityGuard {
    fn drop(&mut self) {
        self.task.abort();
        self.session.release_monitor();
        debug!("Inactivity monitor disarmed");
    }
}
