use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::gcp::{
    DEFAULT_IAM_ENDPOINT, DEFAULT_METADATA_ENDPOINT, DEFAULT_SECRET_MANAGER_ENDPOINT,
};

/// Which implementation backs the identity and secret services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Cloud IAM and Secret Manager.
    #[default]
    Gcp,
    /// In-process fakes that provision accounts and secrets on first use.
    Memory,
}

/// Runtime configuration, read from `KEYROT_*` environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Static bearer token. When unset the metadata server is used.
    pub access_token: Option<SecretString>,
    pub iam_endpoint: Option<Url>,
    pub secret_manager_endpoint: Option<Url>,
    pub metadata_endpoint: Option<Url>,
    pub request_timeout_secs: Option<u64>,
}

fn parse_default(url: &str) -> Url {
    Url::parse(url).expect("valid default endpoint")
}

impl Config {
    pub fn load() -> eyre::Result<Self> {
        Ok(envy::prefixed("KEYROT_").from_env::<Self>()?)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn iam_endpoint(&self) -> Url {
        self.iam_endpoint
            .clone()
            .unwrap_or_else(|| parse_default(DEFAULT_IAM_ENDPOINT))
    }

    pub fn secret_manager_endpoint(&self) -> Url {
        self.secret_manager_endpoint
            .clone()
            .unwrap_or_else(|| parse_default(DEFAULT_SECRET_MANAGER_ENDPOINT))
    }

    pub fn metadata_endpoint(&self) -> Url {
        self.metadata_endpoint
            .clone()
            .unwrap_or_else(|| parse_default(DEFAULT_METADATA_ENDPOINT))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }
}
