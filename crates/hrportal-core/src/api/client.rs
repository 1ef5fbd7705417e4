//! HTTP client facade for the HR portal REST API.
//!
//! Every feature goes through `ApiClient` instead of issuing requests
//! itself, so bearer authentication, logging and user feedback are applied
//! the same way everywhere.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::classify::{classify_failure, classify_success};
use super::transport::{HttpTransport, OutboundRequest, ReqwestTransport};
use super::ApiError;
use crate::auth::SessionStore;
use crate::config::ClientConfig;
use crate::notify::{LogNotifier, Notifier};

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON body: {}", e)))
    }
}

/// API client for the HR portal.
/// Clone is cheap - the transport and session store are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    /// Create a client against the configured origin, reporting through
    /// `notifier`.
    pub fn new(
        config: &ClientConfig,
        session: SessionStore,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let transport =
            ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::with_transport(
            Arc::new(transport),
            &config.api_url,
            session,
            notifier,
        ))
    }

    /// Client whose notices only go to the log.
    pub fn quiet(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        Self::new(config, session, Arc::new(LogNotifier))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        session: SessionStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            notifier,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Bearer header when a token is held; anonymous requests go out bare.
    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.session.token() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(
                |_| ApiError::InvalidRequest("Stored token is not a valid header value".into()),
            )?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send one request through the outbound and inbound stages.
    ///
    /// Failures are classified and logged, then returned unchanged. No
    /// retries.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        let request = OutboundRequest {
            method: method.clone(),
            url: self.url(path),
            headers: self.auth_headers()?,
            body,
        };
        debug!(method = %method, path = path, "Request started");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                let (classification, notice) = classify_failure(path, None, &Value::Null);
                error!(
                    method = %method,
                    path = path,
                    message = %classification.message,
                    error = %err,
                    "Request failed"
                );
                if let Some(notice) = notice {
                    self.notifier.notify(&notice);
                }
                return Err(err);
            }
        };

        if response.status.is_success() {
            debug!(method = %method, path = path, status = response.status.as_u16(), "Response received");
            if let Some(notice) = classify_success(&method, path, &response.body) {
                self.notifier.notify(&notice);
            }
            return Ok(ApiResponse {
                status: response.status,
                body: response.body,
            });
        }

        let (classification, notice) =
            classify_failure(path, Some(response.status), &response.body);
        match notice {
            Some(notice) => {
                warn!(
                    method = %method,
                    path = path,
                    status = response.status.as_u16(),
                    message = %classification.message,
                    "Auth request rejected"
                );
                self.notifier.notify(&notice);
            }
            None => error!(
                method = %method,
                path = path,
                status = response.status.as_u16(),
                message = %classification.message,
                "Request failed"
            ),
        }
        Err(ApiError::from_status(response.status, response.body))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None).await?.json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(Self::encode(body)?))
            .await?
            .json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(Self::encode(body)?))
            .await?
            .json()
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None).await?.json()
    }

    fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))
    }
}
