//! REST API client module for the HR portal backend.
//!
//! `ApiClient` is the single gateway every feature uses. It attaches the
//! session's bearer token, classifies each response and hands any
//! resulting notice to its `Notifier`. Errors are always returned to the
//! caller after classification.

pub mod auth;
pub mod classify;
pub mod client;
pub mod error;
pub mod transport;

pub use reqwest::{Method, StatusCode};

pub use auth::{google_login_url, AuthApi, AuthError, GoogleFlow};
pub use classify::{route_kind, Classification, FieldPolicy, RouteKind};
pub use client::{ApiClient, ApiResponse};
pub use error::{ApiError, ErrorBody};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, ReqwestTransport};
