//! Authentication state for the portal client.
//!
//! This module provides:
//! - `SessionStore`: the signed-in user's token and profile, with memory,
//!   file and OS keychain backends
//! - `SessionGuard`: gatekeeper for protected views that signs the user out
//!   when the token's own expiry is reached
//! - token claim decoding and password strength rules

pub mod credentials;
pub mod guard;
pub mod password;
pub mod session;
pub mod token;

pub use credentials::KeyringBackend;
pub use guard::{session_status, Access, Clock, Navigator, SessionGuard, SessionStatus, SystemClock};
pub use password::{password_strength, Strength};
pub use session::{FileBackend, MemoryBackend, SessionBackend, SessionRecord, SessionStore};
pub use token::{decode_claims, expires_at, is_token_valid, Claims, TokenError};
