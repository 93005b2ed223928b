//! In-memory implementation of the secret service.
//!
//! Secrets must be created up front with [`InMemorySecretService::create_secret`];
//! adding a version to an unknown secret fails the same way Secret Manager
//! does, unless the service was built with
//! [`InMemorySecretService::auto_provisioning`]. Version IDs are assigned
//! sequentially from 1.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::{error::Error, utils::BoxFuture};

use super::{version_name, SecretPayload, SecretService, SecretVersion, VersionState, LATEST};

struct StoredVersion {
    id: u64,
    state: VersionState,
    data: Zeroizing<Vec<u8>>,
    created_at: DateTime<Utc>,
    destroyed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct StoredSecret {
    next_id: u64,
    versions: Vec<StoredVersion>,
}

impl StoredSecret {
    fn describe(&self, secret: &str, version: &StoredVersion) -> SecretVersion {
        SecretVersion {
            name: version_name(secret, &version.id.to_string()),
            state: version.state,
            create_time: Some(version.created_at),
            destroy_time: version.destroyed_at,
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemorySecretService {
    secrets: Arc<papaya::HashMap<String, Arc<Mutex<StoredSecret>>>>,
    calls: Arc<AtomicUsize>,
    auto_provision: bool,
}

/// Splits `projects/p/secrets/s/versions/v` into the secret name and `v`.
fn split_version(name: &str) -> Result<(&str, &str), Error> {
    name.rsplit_once("/versions/")
        .ok_or_else(|| Error::invalid_parameter(format!("not a secret version name: {name}")))
}

impl InMemorySecretService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates unknown secrets when a version is first added to them.
    pub fn auto_provisioning() -> Self {
        Self {
            auto_provision: true,
            ..Self::default()
        }
    }

    /// Creates an empty secret. Creating an existing secret is a no-op.
    pub fn create_secret(&self, secret: impl Into<String>) {
        self.secrets
            .pin()
            .get_or_insert_with(secret.into(), Default::default);
    }

    /// Moves an enabled version to `DISABLED`, keeping its payload.
    pub async fn disable_version(&self, version: &str) -> Result<SecretVersion, Error> {
        let (secret, id) = split_version(version)?;
        let stored = self.secret(secret)?;
        let mut stored = stored.lock().await;

        let pos = stored
            .versions
            .iter()
            .position(|v| v.id.to_string() == id)
            .ok_or_else(|| Error::not_found(version))?;

        let found = &mut stored.versions[pos];
        if found.state != VersionState::Enabled {
            return Err(Error::invalid_parameter(format!(
                "{version} is in state {}",
                found.state
            )));
        }
        found.state = VersionState::Disabled;

        Ok(stored.describe(secret, &stored.versions[pos]))
    }

    /// Number of secret-service operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn secret(&self, secret: &str) -> Result<Arc<Mutex<StoredSecret>>, Error> {
        self.secrets
            .pin()
            .get(secret)
            .cloned()
            .ok_or_else(|| Error::not_found(secret))
    }
}

impl SecretService for InMemorySecretService {
    fn add_version<'a>(&'a self, secret: &'a str, payload: &'a [u8]) -> BoxFuture<'a, SecretVersion> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.auto_provision {
                self.create_secret(secret);
            }

            let stored = self.secret(secret)?;
            let mut stored = stored.lock().await;

            stored.next_id += 1;
            let version = StoredVersion {
                id: stored.next_id,
                state: VersionState::Enabled,
                data: Zeroizing::new(payload.to_vec()),
                created_at: Utc::now(),
                destroyed_at: None,
            };
            let described = stored.describe(secret, &version);
            stored.versions.push(version);

            Ok(described)
        })
    }

    fn list_versions<'a>(&'a self, secret: &'a str) -> BoxFuture<'a, Vec<SecretVersion>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let stored = self.secret(secret)?;
            let stored = stored.lock().await;

            // Newest first, as Secret Manager lists them.
            Ok(stored
                .versions
                .iter()
                .rev()
                .map(|v| stored.describe(secret, v))
                .collect())
        })
    }

    fn access_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretPayload> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let (secret, id) = split_version(version)?;
            let stored = self.secret(secret)?;
            let stored = stored.lock().await;

            let found = if id == LATEST {
                match stored.versions.last() {
                    Some(v) => v,
                    None => {
                        return Err(Error::NoLatestVersion {
                            secret: secret.to_owned(),
                        })
                    }
                }
            } else {
                stored
                    .versions
                    .iter()
                    .find(|v| v.id.to_string() == id)
                    .ok_or_else(|| Error::not_found(version))?
            };

            if found.state != VersionState::Enabled {
                if id == LATEST {
                    return Err(Error::NoLatestVersion {
                        secret: secret.to_owned(),
                    });
                }
                return Err(Error::invalid_parameter(format!(
                    "{version} is in state {}",
                    found.state
                )));
            }

            Ok(SecretPayload {
                name: version_name(secret, &found.id.to_string()),
                data: found.data.clone(),
            })
        })
    }

    fn destroy_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretVersion> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let (secret, id) = split_version(version)?;
            let stored = self.secret(secret)?;
            let mut stored = stored.lock().await;

            let pos = stored
                .versions
                .iter()
                .position(|v| v.id.to_string() == id)
                .ok_or_else(|| Error::not_found(version))?;

            let found = &mut stored.versions[pos];
            if found.state == VersionState::Destroyed {
                return Err(Error::invalid_parameter(format!(
                    "{version} is already destroyed"
                )));
            }

            found.state = VersionState::Destroyed;
            found.data = Zeroizing::new(Vec::new());
            found.destroyed_at = Some(Utc::now());

            Ok(stored.describe(secret, &stored.versions[pos]))
        })
    }
}
