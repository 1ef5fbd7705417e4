//! Core library for hrportal - HTTP client facade, notifications,
//! session store and session guard for the HR records portal API.

pub mod api;
pub mod auth;
pub mod config;
pub mod notify;

pub use api::{ApiClient, ApiError, ApiResponse, AuthApi, AuthError};
pub use auth::{Access, SessionGuard, SessionRecord, SessionStatus, SessionStore};
pub use config::{ClientConfig, ConfigError, Settings, StorageKind};
pub use notify::{ChannelNotifier, LogNotifier, Notice, NoticeEvent, NoticeLevel, Notifier};
