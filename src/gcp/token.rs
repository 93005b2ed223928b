//! OAuth2 access tokens for the Google APIs.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use snafu::ResultExt;
use tokio::sync::Mutex;

use crate::error::{Error, HttpSnafu};

const METADATA_TOKEN_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: TimeDelta = TimeDelta::seconds(60);

/// Where bearer tokens come from.
pub enum TokenSource {
    /// A token supplied through configuration, used as is.
    Static(SecretString),
    /// The GCE / Cloud Run metadata server, with the last token cached.
    Metadata {
        endpoint: url::Url,
        cached: Mutex<Option<CachedToken>>,
    },
}

pub struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: SecretString,
    expires_in: i64,
}

impl TokenSource {
    pub fn fixed(token: SecretString) -> Self {
        Self::Static(token)
    }

    pub fn metadata(endpoint: url::Url) -> Self {
        Self::Metadata {
            endpoint,
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self, http: &reqwest::Client) -> Result<SecretString, Error> {
        match self {
            Self::Static(token) => Ok(duplicate(token)),
            Self::Metadata { endpoint, cached } => {
                let mut cached = cached.lock().await;

                if let Some(token) = cached.as_ref() {
                    if Utc::now() + EXPIRY_MARGIN < token.expires_at {
                        return Ok(duplicate(&token.token));
                    }
                }

                let fresh = fetch_metadata_token(http, endpoint).await?;
                let token = duplicate(&fresh.token);
                *cached = Some(fresh);

                Ok(token)
            }
        }
    }
}

fn duplicate(token: &SecretString) -> SecretString {
    SecretString::from(token.expose_secret().to_owned())
}

async fn fetch_metadata_token(
    http: &reqwest::Client,
    endpoint: &url::Url,
) -> Result<CachedToken, Error> {
    const SERVICE: &str = "metadata";

    let url = super::api_url(endpoint, METADATA_TOKEN_PATH);

    tracing::debug!(%url, "Fetching access token from metadata server");

    let response = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .context(HttpSnafu { service: SERVICE })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Upstream {
            service: SERVICE,
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let MetadataToken {
        access_token,
        expires_in,
    } = response
        .json()
        .await
        .context(HttpSnafu { service: SERVICE })?;

    Ok(CachedToken {
        token: access_token,
        expires_at: Utc::now() + TimeDelta::seconds(expires_in),
    })
}
