//! User-facing notifications.
//!
//! The facade and the session guard never talk to a UI directly; they hand
//! a `Notice` to whatever `Notifier` they were built with. `LogNotifier` is
//! the quiet variant that only logs, `ChannelNotifier` forwards notices to
//! a UI loop that renders them as popups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Welcome,
    Warning,
    Error,
    SessionTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn welcome(name: &str) -> Self {
        Self {
            level: NoticeLevel::Welcome,
            title: format!("Welcome, {}!", name),
            text: "You have successfully signed in.".to_string(),
        }
    }

    pub fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Success".to_string(),
            text: message.to_string(),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: "Too many attempts".to_string(),
            text: "Too many attempts. Please wait a moment before trying again.".to_string(),
        }
    }

    pub fn invalid_credentials(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Invalid credentials".to_string(),
            text: message.to_string(),
        }
    }

    pub fn session_timeout() -> Self {
        Self {
            level: NoticeLevel::SessionTimeout,
            title: "Session timed out".to_string(),
            text: "Your session has expired. Please sign in again.".to_string(),
        }
    }
}

/// Capability to surface notices to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notice without waiting for the user.
    fn notify(&self, notice: &Notice);

    /// Show a blocking notice; resolves once the user dismissed it.
    async fn alert(&self, notice: &Notice);
}

/// Quiet notifier: every notice becomes a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    fn log(notice: &Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Welcome => {
                info!(title = %notice.title, "{}", notice.text)
            }
            NoticeLevel::Warning | NoticeLevel::SessionTimeout => {
                warn!(title = %notice.title, "{}", notice.text)
            }
            NoticeLevel::Error => error!(title = %notice.title, "{}", notice.text),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        Self::log(notice);
    }

    async fn alert(&self, notice: &Notice) {
        Self::log(notice);
    }
}

/// Message sent from a `ChannelNotifier` to the UI loop.
#[derive(Debug)]
pub enum NoticeEvent {
    Show(Notice),
    /// The UI must send on `ack` once the user dismissed the notice.
    Alert { notice: Notice, ack: oneshot::Sender<()> },
}

/// Forwards notices to a UI loop over an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<NoticeEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NoticeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn notify(&self, notice: &Notice) {
        if self.tx.send(NoticeEvent::Show(notice.clone())).is_err() {
            warn!(title = %notice.title, "Notice dropped, UI receiver closed");
        }
    }

    async fn alert(&self, notice: &Notice) {
        let (ack, done) = oneshot::channel();
        let event = NoticeEvent::Alert {
            notice: notice.clone(),
            ack,
        };
        if self.tx.send(event).is_err() {
            warn!(title = %notice.title, "Alert dropped, UI receiver closed");
            return;
        }
        // A dropped sender means the UI went away; nothing left to wait for.
        let _ = done.await;
    }
}
