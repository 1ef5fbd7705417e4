use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method, StatusCode};
use serde_json::Value;

use super::ApiError;

/// A fully prepared request, after the outbound stage ran.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Status plus decoded body. Empty bodies decode to `Value::Null`,
/// non-JSON bodies to `Value::String`.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatch a request. Only transport failures are errors here; any
    /// HTTP status, including 4xx/5xx, comes back as a `RawResponse`.
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, ApiError>;
}

/// Transport backed by a pooled `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn decode_body(text: &str) -> Value {
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(ApiError::truncate_body(text)))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        Ok(RawResponse {
            status,
            body: Self::decode_body(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body() {
        assert_eq!(ReqwestTransport::decode_body(""), Value::Null);
        assert_eq!(ReqwestTransport::decode_body("  \n"), Value::Null);
        assert_eq!(
            ReqwestTransport::decode_body(r#"{"message":"ok"}"#),
            json!({"message": "ok"})
        );
        assert_eq!(
            ReqwestTransport::decode_body("Bad Gateway"),
            Value::String("Bad Gateway".to_string())
        );
    }
}
