//! Identity service: service-account key management.
//!
//! This module defines the [`IdentityService`] trait the rotation procedures
//! are written against, along with the key types it returns. Two
//! implementations are provided:
//! - [`gcp::GcpIdentityService`] talks to the IAM v1 REST API
//! - [`memory::InMemoryIdentityService`] keeps keys in memory for development and tests

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{credential::PrivateKeyData, identity::ServiceAccount, utils::BoxFuture};

pub mod gcp;
pub mod memory;

/// Who manages a key's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    #[default]
    KeyTypeUnspecified,
    UserManaged,
    SystemManaged,
    #[serde(other)]
    Unknown,
}

/// A service-account key as reported by the identity service.
///
/// `private_key_data` is only populated in the response to a key creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountKey {
    pub name: String,
    #[serde(default)]
    pub key_type: KeyType,
    #[serde(default)]
    pub private_key_data: Option<PrivateKeyData>,
    #[serde(default)]
    pub valid_after_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
}

impl ServiceAccountKey {
    /// The key ID, i.e. the last segment of the key's resource name.
    pub fn key_id(&self) -> &str {
        crate::utils::last_segment(&self.name)
    }

    pub fn is_system_managed(&self) -> bool {
        self.key_type == KeyType::SystemManaged
    }
}

/// Key lifecycle operations on service accounts.
pub trait IdentityService: Send + Sync + 'static {
    /// Creates a new user-managed key for the account.
    ///
    /// The returned key carries the private key data; this is the only time
    /// the identity service hands it out.
    fn create_key<'a>(&'a self, account: &'a ServiceAccount) -> BoxFuture<'a, ServiceAccountKey>;

    /// Lists every key registered for the account, of any type.
    fn list_keys<'a>(
        &'a self,
        account: &'a ServiceAccount,
    ) -> BoxFuture<'a, Vec<ServiceAccountKey>>;

    /// Deletes a key by its full resource name.
    fn delete_key<'a>(&'a self, key_name: &'a str) -> BoxFuture<'a, ()>;
}
