use crate::error::{Result, SmokeError};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Timeout for checking that a generated download URL is reachable
pub const DOWNLOAD_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tenant {
    pub name: String,
}

/// Body of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub tenant: Option<Tenant>,
}

/// Status code and JSON body of an API call. Bodies that are not JSON
/// decode to `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        Self::with_timeout(api_url, 30)
    }

    pub fn with_timeout(api_url: &str, timeout_secs: u64) -> Result<Self> {
        let parsed = Url::parse(api_url)
            .map_err(|e| SmokeError::InvalidUrl(format!("{}: {}", api_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SmokeError::InvalidUrl(format!(
                "{}: expected an http or https URL",
                api_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("clinickit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a resource path onto the API base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange credentials for a bearer token. Every later request made
    /// through this client carries the token.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session> {
        info!("Logging in to {} as {}", self.base_url, email);

        let response = self
            .client
            .post(self.endpoint("auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 {
            return Err(SmokeError::LoginFailed { status, body });
        }

        let session: Session = serde_json::from_str(&body)
            .map_err(|e| SmokeError::DecodeError(format!("login response: {}", e)))?;
        self.token = Some(session.token.clone());
        debug!("Logged in as user {}", session.user.id);

        Ok(session)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        let request = self.client.get(self.endpoint(path)).query(query);
        self.send("GET", path, request).await
    }

    pub async fn post(&self, path: &str, payload: &Value) -> Result<ApiResponse> {
        let request = self.client.post(self.endpoint(path)).json(payload);
        self.send("POST", path, request).await
    }

    pub async fn put(&self, path: &str, payload: &Value) -> Result<ApiResponse> {
        let request = self.client.put(self.endpoint(path)).json(payload);
        self.send("PUT", path, request).await
    }

    /// HEAD an absolute URL without credentials
    pub async fn head(&self, url: &str, timeout: Duration) -> Result<HeadResponse> {
        let response = self.client.head(url).timeout(timeout).send().await?;
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_type: header(CONTENT_TYPE),
            content_length: header(CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        })
    }

    async fn send(&self, verb: &str, path: &str, request: RequestBuilder) -> Result<ApiResponse> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!("{} {} -> {}", verb, path, status);

        Ok(ApiResponse {
            status,
            body: serde_json::from_str(&text).unwrap_or(Value::Null),
        })
    }
}
