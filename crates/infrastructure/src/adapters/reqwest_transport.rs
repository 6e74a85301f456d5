//! API transport using reqwest.
//!
//! Joins request paths onto the configured API base URL, attaches the
//! bearer token and serialises JSON bodies. Anything the server answers,
//! error statuses included, comes back as an [`ApiResponse`]; only
//! failures to get an answer become [`TransportError`]s.

use std::time::Duration;

use async_trait::async_trait;
use pickup_application::ports::{ApiTransport, TransportError};
use pickup_domain::{AccessToken, ApiRequest, ApiResponse, ClientConfig, HttpMethod};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use url::Url;

/// [`ApiTransport`] over a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport for the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be
    /// created.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let base = config
            .api_base()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("pickup/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self::with_client(client, base, config.request_timeout()))
    }

    /// Creates a transport around an existing client.
    #[must_use]
    pub const fn with_client(client: Client, base: Url, timeout: Duration) -> Self {
        Self {
            client,
            base,
            timeout,
        }
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    /// Absolute URL for `request`. A path prefix on the base URL is kept.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let path_and_query = request
            .path_and_query()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let joined = format!(
            "{}{path_and_query}",
            self.base.as_str().trim_end_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{e}: {joined}")))
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                timeout_ms: self.timeout_ms(),
            };
        }
        if error.is_connect() {
            return TransportError::ConnectionFailed(error.to_string());
        }
        if error.is_builder() {
            return TransportError::InvalidRequest(error.to_string());
        }
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        tracing::debug!(
            method = %request.method,
            %url,
            retried = request.retried,
            "sending request"
        );

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(self.timeout);

        if let Some(token) = access_token {
            builder = builder.header(AUTHORIZATION, token.authorization_header());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| TransportError::InvalidRequest(format!("invalid JSON body: {e}")))?;
            builder = builder
                .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(bytes);
        }

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Other(format!("failed to read body: {e}")))?
            .to_vec();

        tracing::debug!(status, bytes = body.len(), "response received");
        Ok(ApiResponse::new(status, headers, body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn transport(base: &str) -> ReqwestTransport {
        let config = ClientConfig {
            api_base_url: base.to_string(),
            request_timeout_secs: 5,
            ..ClientConfig::default()
        };
        ReqwestTransport::new(&config).unwrap()
    }

    /// Accepts one connection, captures the raw request and answers with
    /// `status` and a JSON body.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });
        (base, handle)
    }

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Get), Method::GET);
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(ReqwestTransport::to_reqwest_method(HttpMethod::Delete), Method::DELETE);
    }

    #[test]
    fn test_url_keeps_base_prefix() {
        let transport = transport("https://api.example.com/v1/");
        let request = ApiRequest::get("/orders").with_query("page", "2");
        assert_eq!(
            transport.url_for(&request).unwrap().as_str(),
            "https://api.example.com/v1/orders?page=2"
        );
    }

    #[test]
    fn test_relative_path_is_rejected() {
        let transport = transport("https://api.example.com");
        let result = transport.url_for(&ApiRequest::get("orders"));
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_bearer_and_json_body() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"message":"expired"}"#).await;
        let transport = transport(&base);
        let token = AccessToken::new("a1").unwrap();
        let request = ApiRequest::patch("/users/me", json!({"phone": "01012345678"}));

        let response = transport.send(&request, Some(&token)).await.unwrap();
        assert_eq!(response.status, 401);
        assert!(response.is_unauthorized());
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("PATCH /users/me HTTP/1.1\r\n"));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("authorization: bearer a1\r\n"));
        assert!(lower.contains("content-type: application/json\r\n"));
        assert!(raw.ends_with(r#"{"phone":"01012345678"}"#));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = transport(&base).send(&ApiRequest::get("/orders"), None).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }
}
