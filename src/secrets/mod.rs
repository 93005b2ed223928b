//! Secret service: versioned secret payloads.
//!
//! [`SecretService`] is the seam between the rotation procedures and the
//! secret store. [`gcp::GcpSecretService`] talks to the Secret Manager v1
//! REST API; [`memory::InMemorySecretService`] is used for development and
//! tests.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::utils::BoxFuture;

pub mod gcp;
pub mod memory;

/// Alias that resolves to the most recently created version of a secret.
pub const LATEST: &str = "latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionState {
    #[default]
    StateUnspecified,
    Enabled,
    Disabled,
    Destroyed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretVersion {
    pub name: String,
    #[serde(default)]
    pub state: VersionState,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub destroy_time: Option<DateTime<Utc>>,
}

impl SecretVersion {
    pub fn version_id(&self) -> &str {
        crate::utils::last_segment(&self.name)
    }

    pub fn is_enabled(&self) -> bool {
        self.state == VersionState::Enabled
    }
}

/// The payload of an accessed secret version.
#[derive(Debug)]
pub struct SecretPayload {
    /// Name of the resolved version, never an alias.
    pub name: String,
    pub data: Zeroizing<Vec<u8>>,
}

/// Resource name of a version of `secret`, e.g. `version_name(s, LATEST)`.
pub fn version_name(secret: &str, version: &str) -> String {
    format!("{secret}/versions/{version}")
}

/// Versioned secret storage.
///
/// Secrets are addressed by their full resource name
/// (`projects/{project}/secrets/{secret}`), versions likewise
/// (`projects/{project}/secrets/{secret}/versions/{version}`).
pub trait SecretService: Send + Sync + 'static {
    /// Adds a new enabled version holding `payload`.
    fn add_version<'a>(&'a self, secret: &'a str, payload: &'a [u8]) -> BoxFuture<'a, SecretVersion>;

    /// Lists every version of the secret, in any state.
    fn list_versions<'a>(&'a self, secret: &'a str) -> BoxFuture<'a, Vec<SecretVersion>>;

    /// Reads the payload of a version. `version` may use the [`LATEST`] alias.
    fn access_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretPayload>;

    /// Irrevocably destroys a version's payload.
    fn destroy_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretVersion>;
}
