use anyhow::Result;
use reqwest::header::COOKIE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::error::{BackendError, BackendResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost/planview";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(40);
pub const LOGIN_CERT_COOKIE: &str = "LoginCert";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    /// Default credential, used when a request carries none of its own
    pub login_cert: Option<String>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_cert: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Per-call additions layered over the client defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
}

impl RequestOptions {
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_cookie<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.cookies.insert(key.into(), value.into());
        self
    }

    /// Override the `LoginCert` cookie when a credential is present
    pub fn with_login_cert(self, login_cert: Option<&str>) -> Self {
        match login_cert {
            Some(cert) => self.with_cookie(LOGIN_CERT_COOKIE, cert),
            None => self,
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: Arc<BackendConfig>,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn default_headers() -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "User-Agent".to_string(),
                concat!("pfagent/", env!("CARGO_PKG_VERSION")).to_string(),
            ),
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    fn merged_cookies(&self, overrides: HashMap<String, String>) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        if let Some(cert) = &self.config.login_cert {
            cookies.insert(LOGIN_CERT_COOKIE.to_string(), cert.clone());
        }
        cookies.extend(overrides);
        cookies
    }

    /// Issue a request and return the parsed JSON body, or `None` when the body is empty
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        options: RequestOptions,
    ) -> BackendResult<Option<Value>> {
        let url = self.url(endpoint);

        let mut headers = Self::default_headers();
        headers.extend(options.headers);
        let cookies = self.merged_cookies(options.cookies);

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !cookies.is_empty() {
            let cookie_header = cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.header(COOKIE, cookie_header);
        }
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        tracing::debug!(
            %method,
            %url,
            cookies = ?cookies.keys().collect::<Vec<_>>(),
            "backend request"
        );

        let response = request.send().await.map_err(|source| BackendError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| BackendError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    /// Like [`request`](Self::request), but every failure is logged and reduced to `None`
    pub async fn request_or_none(
        &self,
        endpoint: &str,
        method: Method,
        options: RequestOptions,
    ) -> Option<Value> {
        match self.request(endpoint, method, options).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, endpoint, "backend request failed");
                None
            }
        }
    }

    /// Request that must return a JSON body
    pub async fn request_json(
        &self,
        endpoint: &str,
        method: Method,
        options: RequestOptions,
    ) -> BackendResult<Value> {
        self.request(endpoint, method, options)
            .await?
            .ok_or_else(|| BackendError::Empty(endpoint.to_string()))
    }
}
