//! Shared plumbing for the Google Cloud REST backends.

use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize};
use snafu::ResultExt;

use crate::error::{Error, HttpSnafu};

pub mod token;

pub use token::TokenSource;

pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.googleapis.com/";
pub const DEFAULT_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com/";
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal/";

/// Authenticated JSON client shared by the Google backends.
///
/// Cloning is cheap: the underlying connection pool and token cache are
/// shared.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    tokens: std::sync::Arc<TokenSource>,
}

/// An empty JSON object, as returned by delete calls.
#[derive(Debug, Deserialize)]
pub struct Empty {}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, tokens: TokenSource) -> Self {
        Self {
            http,
            tokens: std::sync::Arc::new(tokens),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends an authenticated request and decodes the JSON response.
    ///
    /// Non-success responses are decoded from Google's error envelope into
    /// [`Error::Upstream`].
    pub async fn send<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: RequestBuilder,
    ) -> Result<T, Error> {
        let token = self.tokens.token(&self.http).await?;

        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .context(HttpSnafu { service })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(service, status, &body));
        }

        response.json::<T>().await.context(HttpSnafu { service })
    }
}

/// Builds a request URL from an endpoint base and an API path.
pub fn api_url(endpoint: &url::Url, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn upstream_error(service: &'static str, status: reqwest::StatusCode, body: &str) -> Error {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error:
                GoogleError {
                    message,
                    status: Some(code),
                },
        }) => format!("{code}: {message}"),
        Ok(ErrorEnvelope { error }) => error.message,
        Err(_) if !body.is_empty() => body.to_owned(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned(),
    };

    Error::Upstream {
        service,
        status: status.as_u16(),
        message,
    }
}
