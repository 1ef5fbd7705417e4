//! Sign-in, registration and password-reset calls.
//!
//! These go through the same facade as every other request, so the
//! welcome and invalid-credential notices come from the classifier; this
//! module only adds local validation and writes the session on success.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use super::{ApiClient, ApiError};
use crate::auth::SessionRecord;

const SIGN_IN_PATH: &str = "/auth/signin/";
const GOOGLE_SIGN_IN_PATH: &str = "/auth/signin/email";
const REGISTER_PATH: &str = "/auth/register";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to store session: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Profile fields returned by both sign-in endpoints.
#[derive(Debug, Clone, Deserialize)]
struct SignInResponse {
    access_token: String,
    #[serde(default)]
    hr_role: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    employee_id: Option<String>,
    #[serde(default)]
    workstation_hold: Option<serde_json::Value>,
    #[serde(default)]
    f_name: Option<String>,
    #[serde(default)]
    l_name: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl SignInResponse {
    fn into_record(self, employee_id: Option<&str>) -> SessionRecord {
        let workstation_hold = match self.workstation_hold {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        SessionRecord {
            access_token: self.access_token,
            hr_role: self.hr_role.unwrap_or_default(),
            employee_id: employee_id
                .map(str::to_string)
                .or(self.employee_id)
                .unwrap_or_default(),
            first_name: self.f_name.unwrap_or_default(),
            last_name: self.l_name.unwrap_or_default(),
            workstation_hold,
        }
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    employee_id: &'a str,
    password: &'a str,
}

/// Which Google callback the backend should return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleFlow {
    SignIn,
    SignUp,
}

impl GoogleFlow {
    fn callback_segment(self) -> &'static str {
        match self {
            GoogleFlow::SignIn => "signin",
            GoogleFlow::SignUp => "signup",
        }
    }
}

/// URL that starts the Google OAuth round trip on the backend.
pub fn google_login_url(api_url: &str, app_origin: &str, flow: GoogleFlow) -> String {
    format!(
        "{}/google-auth/google/login?redirect={}/auth/google/callback/{}",
        api_url.trim_end_matches('/'),
        app_origin.trim_end_matches('/'),
        flow.callback_segment()
    )
}

fn require(value: &str, name: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::MissingField(name))
    } else {
        Ok(())
    }
}

fn require_match(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password != confirm {
        Err(AuthError::PasswordMismatch)
    } else {
        Ok(())
    }
}

/// Auth-flow calls over a shared `ApiClient`.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Sign in with employee id and password; the session is stored on success.
    pub async fn sign_in(&self, employee_id: &str, password: &str) -> Result<SessionRecord, AuthError> {
        require(employee_id, "Employee ID")?;
        require(password, "Password")?;

        let response: SignInResponse = self
            .client
            .post(SIGN_IN_PATH, &Credentials { employee_id, password })
            .await?;

        self.store(response.into_record(Some(employee_id)))
    }

    /// Complete a Google sign-in with the callback's email and id token.
    pub async fn sign_in_with_google(&self, email: &str, id_token: &str) -> Result<SessionRecord, AuthError> {
        require(email, "Email")?;
        require(id_token, "Authentication token")?;

        let response: SignInResponse = self
            .client
            .post(GOOGLE_SIGN_IN_PATH, &json!({ "email": email, "id_token": id_token }))
            .await?;

        self.store(response.into_record(None))
    }

    pub async fn register(&self, employee_id: &str, password: &str, confirm: &str) -> Result<(), AuthError> {
        require(employee_id, "Employee ID")?;
        require(password, "Password")?;
        require_match(password, confirm)?;

        self.client
            .request(
                reqwest::Method::POST,
                REGISTER_PATH,
                Some(json!({ "employee_id": employee_id, "password": password })),
            )
            .await?;
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        require(email, "Email")?;
        self.client
            .request(
                reqwest::Method::POST,
                FORGOT_PASSWORD_PATH,
                Some(json!({ "email": email })),
            )
            .await?;
        Ok(())
    }

    /// Set a new password using the token from the reset link.
    pub async fn reset_password(&self, token: &str, new_password: &str, confirm: &str) -> Result<(), AuthError> {
        require(token, "Reset token")?;
        require(new_password, "New password")?;
        require_match(new_password, confirm)?;

        self.client
            .request(
                reqwest::Method::POST,
                RESET_PASSWORD_PATH,
                Some(json!({ "token": token, "new_password": new_password })),
            )
            .await?;
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.client
            .session()
            .clear()
            .map_err(|e| AuthError::Storage(e.into()))?;
        info!("Signed out");
        Ok(())
    }

    fn store(&self, record: SessionRecord) -> Result<SessionRecord, AuthError> {
        self.client
            .session()
            .set(record.clone())
            .map_err(|e| AuthError::Storage(e.into()))?;
        info!(employee_id = %record.employee_id, role = %record.hr_role, "Signed in");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_login_url() {
        assert_eq!(
            google_login_url("https://api.hr.example/", "https://hr.example", GoogleFlow::SignIn),
            "https://api.hr.example/google-auth/google/login?redirect=https://hr.example/auth/google/callback/signin"
        );
        assert!(google_login_url("https://a", "https://b", GoogleFlow::SignUp)
            .ends_with("/auth/google/callback/signup"));
    }

    #[test]
    fn test_sign_in_response_into_record() {
        let response: SignInResponse = serde_json::from_value(json!({
            "access_token": "tok",
            "hr_role": "hr_admin",
            "workstation_hold": 3,
            "f_name": "Ana",
            "l_name": "Cruz"
        }))
        .unwrap();
        let record = response.into_record(Some("1001"));
        assert_eq!(record.employee_id, "1001");
        assert_eq!(record.workstation_hold.as_deref(), Some("3"));
        assert_eq!(record.display_name(), "Ana Cruz");
    }

    #[test]
    fn test_google_response_takes_employee_id_from_body() {
        let response: SignInResponse = serde_json::from_value(json!({
            "access_token": "tok",
            "employee_id": 2044,
            "workstation_hold": null
        }))
        .unwrap();
        let record = response.into_record(None);
        assert_eq!(record.employee_id, "2044");
        assert!(record.workstation_hold.is_none());
    }

    #[test]
    fn test_local_validation() {
        assert!(matches!(require_match("a", "b"), Err(AuthError::PasswordMismatch)));
        assert!(require_match("a", "a").is_ok());
        assert!(matches!(require("  ", "Email"), Err(AuthError::MissingField("Email"))));
    }
}
