//! Session guard for protected views.
//!
//! A view calls `mount()` before rendering protected content. The guard
//! reads the held token, works out how long it has left from the token's
//! own expiry claim, and arms a single timer that runs the logout flow
//! when that moment arrives, whether or not any request is made meanwhile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::session::SessionStore;
use super::token::expires_at;
use crate::notify::{Notice, Notifier};

/// Default path the user is sent to once the session is gone
pub const DEFAULT_SIGN_IN_PATH: &str = "/";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Performs the hard redirect to the sign-in entry point.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Missing,
    Expired,
    Active { expires_in: Duration },
}

/// Derive the session status from a token without side effects.
/// Tokens whose expiry cannot be read count as expired.
pub fn session_status(token: Option<&str>, now: DateTime<Utc>) -> SessionStatus {
    let Some(token) = token else {
        return SessionStatus::Missing;
    };
    match expires_at(token) {
        Ok(exp) if exp > now => SessionStatus::Active {
            expires_in: (exp - now).to_std().unwrap_or(Duration::ZERO),
        },
        Ok(_) => SessionStatus::Expired,
        Err(e) => {
            debug!(error = %e, "Unreadable token treated as expired");
            SessionStatus::Expired
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

struct ExpiryFlow {
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    running: AtomicBool,
}

impl ExpiryFlow {
    /// Notice (awaited), then clear, then redirect. Overlapping triggers
    /// collapse into the run already in progress.
    async fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Expiry flow already running");
            return;
        }

        info!("Session expired, signing out");
        self.notifier.alert(&Notice::session_timeout()).await;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.navigator.redirect(&self.sign_in_path);

        self.running.store(false, Ordering::SeqCst);
    }
}

pub struct SessionGuard {
    flow: Arc<ExpiryFlow>,
    clock: Arc<dyn Clock>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SessionGuard {
    pub fn new(
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            flow: Arc::new(ExpiryFlow {
                store,
                notifier,
                navigator,
                sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
                running: AtomicBool::new(false),
            }),
            clock: Arc::new(SystemClock),
            timer: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sign_in_path(mut self, path: &str) -> Self {
        if let Some(flow) = Arc::get_mut(&mut self.flow) {
            flow.sign_in_path = path.to_string();
        }
        self
    }

    pub fn status(&self) -> SessionStatus {
        session_status(self.flow.store.token().as_deref(), self.clock.now())
    }

    /// Check the session and arm the expiry timer.
    ///
    /// `Denied` means protected content must not render; the logout flow
    /// has already been started and survives `unmount`. Any timer from an
    /// earlier mount is cancelled first. Must be called within a tokio
    /// runtime.
    pub fn mount(&self) -> Access {
        let token = self.flow.store.token();
        match session_status(token.as_deref(), self.clock.now()) {
            SessionStatus::Active { expires_in } => {
                debug!(delay_ms = expires_in.as_millis() as u64, "Session guard mounted");
                // Only reachable with a token present.
                if let Some(token) = token {
                    self.arm(token, expires_in);
                }
                Access::Granted
            }
            status @ (SessionStatus::Missing | SessionStatus::Expired) => {
                debug!(?status, "Session guard denied access");
                self.unmount();
                let flow = Arc::clone(&self.flow);
                tokio::spawn(async move { flow.run().await });
                Access::Denied
            }
        }
    }

    /// Cancel the pending timer, if any. A logout flow that already
    /// started is left to finish.
    pub fn unmount(&self) {
        if let Some(timer) = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take() {
            timer.abort();
        }
    }

    /// Whether a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Run the logout flow now, e.g. on an explicit sign-out.
    pub async fn expire_now(&self) {
        self.unmount();
        self.flow.run().await;
    }

    /// Arm a timer for `token`. The deadline is fixed now, not when the
    /// task first runs.
    fn arm(&self, token: String, delay: Duration) {
        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stale) = slot.take() {
            stale.abort();
        }
        let flow = Arc::clone(&self.flow);
        let clock = Arc::clone(&self.clock);
        let deadline = Instant::now() + delay;
        *slot = Some(tokio::spawn(async move {
            if !wait_for_expiry(&flow.store, clock.as_ref(), token, deadline).await {
                return;
            }
            // Detached so a later mount cannot abort a flow mid-notice.
            tokio::spawn(async move { flow.run().await });
        }));
    }
}

/// Sleep until the armed token expires. If the store picked up a different
/// token meanwhile, follow that token's expiry instead. Returns false when
/// there is nothing left to expire.
async fn wait_for_expiry(
    store: &SessionStore,
    clock: &dyn Clock,
    mut armed: String,
    mut deadline: Instant,
) -> bool {
    loop {
        tokio::time::sleep_until(deadline).await;
        let current = store.token();
        if current.as_deref() == Some(armed.as_str()) {
            return true;
        }
        match (session_status(current.as_deref(), clock.now()), current) {
            (SessionStatus::Active { expires_in }, Some(token)) => {
                debug!(delay_ms = expires_in.as_millis() as u64, "Token replaced, timer moved");
                armed = token;
                deadline = Instant::now() + expires_in;
            }
            (SessionStatus::Expired, _) => return true,
            _ => {
                debug!("Session gone before expiry, timer dropped");
                return false;
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.unmount();
    }
}
