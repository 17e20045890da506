//! HTTP transport.
//!
//! The catalog talks to the server only through the [`Transport`] trait, so
//! tests can swap the network for an in-memory server. [`HttpTransport`] is
//! the real implementation over `reqwest`, with credential injection and
//! retry on transient failures.

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::{Client, Method};
use tracing::{debug, instrument, warn};

use gs_common::{GsError, GsResult};

use crate::config::{Auth, CatalogConfig};
use crate::retry::RetryPolicy;

/// One outgoing request. Headers are built fresh for every request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn accept(self, content_type: &str) -> Self {
        self.header("Accept", content_type)
    }

    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self.header("Content-Type", content_type)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes requests against the configuration API.
///
/// Implementations answer every response the server gives, whatever its
/// status. An `Err` means no response was obtained at all and is always a
/// [`GsError::FailedRequest`] without a status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse>;
}

/// `reqwest` backed transport.
pub struct HttpTransport {
    client: Client,
    auth: Auth,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(config: &CatalogConfig) -> GsResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.validate_ssl)
            .build()
            .map_err(|e| GsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth: config.auth.clone(),
            retry: config.retry_policy(),
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        match &self.auth {
            Auth::None => {}
            Auth::Basic { username, password } => {
                builder = builder.basic_auth(username, Some(password));
            }
            Auth::Token { token } => {
                builder = builder
                    .bearer_auth(token)
                    .query(&[("access_token", token.as_str())]);
            }
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> GsResult<HttpResponse> {
        let retryable = self.retry.allows_method(&request.method);
        let mut retry_count = 0;

        loop {
            counter!("gsconfig_http_requests_total", "method" => request.method.to_string()).increment(1);

            let outcome = self.send_once(&request).await;
            let can_retry = retryable && retry_count < self.retry.max_retries;

            match outcome {
                Ok(response) if can_retry && self.retry.is_retryable_status(response.status) => {
                    retry_count += 1;
                    let delay = self.retry.delay_for_retry(retry_count);
                    warn!(
                        status = response.status,
                        retry = retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Transient server status, retrying"
                    );
                    counter!("gsconfig_http_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    debug!(status = response.status, bytes = response.body.len(), "Response received");
                    return Ok(response);
                }
                Err(e) if can_retry && (e.is_connect() || e.is_timeout()) => {
                    retry_count += 1;
                    let delay = self.retry.delay_for_retry(retry_count);
                    warn!(
                        error = %e,
                        retry = retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, retrying"
                    );
                    counter!("gsconfig_http_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(GsError::FailedRequest {
                        status: None,
                        url: request.url.clone(),
                        body: e.to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(Method::PUT, "http://localhost/rest/workspaces/acme.xml")
            .accept("application/xml")
            .body("application/xml", "<workspace/>");
        assert_eq!(request.header_value("accept"), Some("application/xml"));
        assert_eq!(request.header_value("Content-Type"), Some("application/xml"));
        assert_eq!(request.body.as_deref(), Some(&b"<workspace/>"[..]));
    }

    #[test]
    fn test_response_status() {
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(404, "No such workspace").is_success());
        assert_eq!(HttpResponse::new(500, "boom").text(), "boom");
    }

    #[tokio::test]
    async fn test_connection_refused_is_failed_request() {
        let config = CatalogConfig {
            retries: 0,
            ..CatalogConfig::new("http://127.0.0.1:1/geoserver/rest")
        };
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport
            .execute(HttpRequest::get("http://127.0.0.1:1/geoserver/rest/workspaces.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, GsError::FailedRequest { status: None, .. }));
    }
}
