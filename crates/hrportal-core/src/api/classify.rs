//! Response classification.
//!
//! Decides which notice, if any, a finished request produces. Auth-flow
//! endpoints (sign-in, register, password reset) get their own treatment;
//! everything else only narrates successful mutations and leaves error
//! feedback to the calling feature.

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::notify::Notice;

/// Path fragments of the auth-flow endpoints, matched as substrings.
const SIGN_IN_ROUTE: &str = "/auth/signin/";
const REGISTER_ROUTE: &str = "/auth/register";
const FORGOT_PASSWORD_ROUTE: &str = "/auth/forgot-password";
const RESET_PASSWORD_ROUTE: &str = "/auth/reset-password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    SignIn,
    Register,
    PasswordReset,
    Generic,
}

impl RouteKind {
    pub fn is_special(self) -> bool {
        !matches!(self, RouteKind::Generic)
    }
}

pub fn route_kind(path: &str) -> RouteKind {
    if path.contains(SIGN_IN_ROUTE) {
        RouteKind::SignIn
    } else if path.contains(REGISTER_ROUTE) {
        RouteKind::Register
    } else if path.contains(FORGOT_PASSWORD_ROUTE) || path.contains(RESET_PASSWORD_ROUTE) {
        RouteKind::PasswordReset
    } else {
        RouteKind::Generic
    }
}

type Extractor = fn(&Value) -> Option<&str>;

/// Ordered list of field extractors; the first non-empty string wins.
pub struct FieldPolicy {
    pub extractors: &'static [Extractor],
    pub fallback: &'static str,
}

impl FieldPolicy {
    pub fn resolve(&self, body: &Value) -> String {
        self.extractors
            .iter()
            .filter_map(|extract| extract(body))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(self.fallback)
            .to_string()
    }
}

fn user_name(body: &Value) -> Option<&str> {
    body.get("user")?.get("name")?.as_str()
}

fn full_name(body: &Value) -> Option<&str> {
    body.get("full_name")?.as_str()
}

fn detail(body: &Value) -> Option<&str> {
    body.get("detail")?.as_str()
}

fn message(body: &Value) -> Option<&str> {
    body.get("message")?.as_str()
}

pub const DISPLAY_NAME: FieldPolicy = FieldPolicy {
    extractors: &[user_name, full_name],
    fallback: "User",
};

pub const SUCCESS_MESSAGE: FieldPolicy = FieldPolicy {
    extractors: &[message],
    fallback: "Operation Successful!",
};

pub const ERROR_MESSAGE: FieldPolicy = FieldPolicy {
    extractors: &[detail, message],
    fallback: "Something went wrong",
};

/// Facts derived from one response; never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub route: RouteKind,
    pub status: Option<StatusCode>,
    pub message: String,
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

pub fn classify_success(method: &Method, path: &str, body: &Value) -> Option<Notice> {
    if route_kind(path).is_special() {
        return Some(Notice::welcome(&DISPLAY_NAME.resolve(body)));
    }
    if is_mutating(method) {
        return Some(Notice::success(&SUCCESS_MESSAGE.resolve(body)));
    }
    None
}

pub fn classify_failure(
    path: &str,
    status: Option<StatusCode>,
    body: &Value,
) -> (Classification, Option<Notice>) {
    let classification = Classification {
        route: route_kind(path),
        status,
        message: ERROR_MESSAGE.resolve(body),
    };

    let notice = if classification.route.is_special() {
        match status.map(|s| s.as_u16()) {
            Some(429) => Some(Notice::rate_limited()),
            Some(401 | 403 | 404) => Some(Notice::invalid_credentials(&classification.message)),
            _ => None,
        }
    } else {
        None
    };

    (classification, notice)
}
