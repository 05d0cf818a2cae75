//! Outbound transport for provider backends.
//!
//! Backends build a [`TransportRequest`] and hand it to a [`QueryTransport`];
//! the transport owns connection pooling and returns the raw response body.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn get(&self, request: TransportRequest) -> Result<Vec<u8>, TransportError>;
}

/// HTTP transport backed by one pooled [`reqwest::Client`] shared by every provider.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn get(&self, request: TransportRequest) -> Result<Vec<u8>, TransportError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|error| TransportError::Request {
            url: request.url.clone(),
            message: error.to_string(),
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::Request {
                url: request.url.clone(),
                message: error.to_string(),
            })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                url: request.url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::{TransportError, TransportRequest};

    #[test]
    fn builds_requests_with_params_and_headers() {
        let request = TransportRequest::get("http://prom:9090/api/v1/query")
            .with_param("query", "up")
            .with_param("time", "2024-05-01T12:00:00.000Z")
            .with_header("X-Scope", "tenant-a");

        assert_eq!(request.param("query"), Some("up"));
        assert_eq!(request.param("missing"), None);
        assert_eq!(request.headers, vec![("X-Scope".to_string(), "tenant-a".to_string())]);
    }

    #[test]
    fn status_errors_carry_url_and_body() {
        let error = TransportError::Status {
            url: "http://prom:9090/api/v1/query".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "http://prom:9090/api/v1/query returned status 503: unavailable"
        );
    }
}
