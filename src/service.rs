//! Key rotation procedures.
//!
//! A rotation for one service account has two halves:
//! - [`Service::create_and_upload`] mints a new key, stores it as a new
//!   secret version and destroys every other enabled version.
//! - [`Service::prune_stale_keys`] deletes every user-managed key that isn't
//!   the one held by the secret's latest version.
//!
//! Creating before pruning keeps the pair crash-consistent: `latest` always
//! names the newest key, so an interrupted rotation never prunes the key that
//! is actually stored.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use crate::{
    config::{Backend, Config},
    credential::CredentialDocument,
    error::Error,
    gcp::{GoogleClient, TokenSource},
    iam::{gcp::GcpIdentityService, memory::InMemoryIdentityService, IdentityService},
    identity::ServiceAccount,
    operation::Operation,
    secrets::{
        gcp::GcpSecretService, memory::InMemorySecretService, version_name, SecretService, LATEST,
    },
};

/// Long-lived handles to the identity and secret services.
pub struct Service {
    identity: Box<dyn IdentityService>,
    secrets: Box<dyn SecretService>,
}

/// Result of [`Service::create_and_upload`].
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Resource name of the newly created key.
    pub key_name: String,
    /// Resource name of the secret version holding it.
    pub version: String,
    /// Versions that were enabled before and have now been destroyed.
    pub destroyed_versions: Vec<String>,
}

/// Result of [`Service::prune_stale_keys`].
#[derive(Debug, Clone, Serialize)]
pub struct PruneOutcome {
    /// Key ID found in the secret's latest version.
    pub retained_key_id: String,
    pub deleted_keys: Vec<String>,
}

/// What happened to one service account during a request.
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<UploadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruned: Option<PruneOutcome>,
}

impl AccountReport {
    fn new(account: &ServiceAccount) -> Self {
        Self {
            account: account.email().to_owned(),
            created: None,
            pruned: None,
        }
    }
}

#[bon::bon]
impl Service {
    #[builder]
    pub fn new<I, S>(identity: I, secrets: S) -> Self
    where
        I: IdentityService,
        S: SecretService,
    {
        Self {
            identity: Box::new(identity),
            secrets: Box::new(secrets),
        }
    }

    /// Builds the backends selected by `config`.
    pub fn connect_with(config: &Config) -> eyre::Result<Self> {
        match config.backend {
            Backend::Memory => {
                tracing::warn!("Using in-memory backends, no cloud resources will be touched");

                Ok(Self::builder()
                    .identity(InMemoryIdentityService::auto_provisioning())
                    .secrets(InMemorySecretService::auto_provisioning())
                    .build())
            }
            Backend::Gcp => {
                let http = reqwest::Client::builder()
                    .timeout(config.request_timeout())
                    .build()?;

                let tokens = match &config.access_token {
                    Some(token) => TokenSource::fixed(SecretString::from(
                        token.expose_secret().to_owned(),
                    )),
                    None => TokenSource::metadata(config.metadata_endpoint()),
                };

                let client = GoogleClient::new(http, tokens);

                Ok(Self::builder()
                    .identity(GcpIdentityService::new(
                        client.clone(),
                        config.iam_endpoint(),
                    ))
                    .secrets(GcpSecretService::new(
                        client,
                        config.secret_manager_endpoint(),
                    ))
                    .build())
            }
        }
    }

    /// Creates a new key for `account` and makes it the only enabled version
    /// of the account's secret.
    ///
    /// There is no compensation: if storing the key fails, the new key is
    /// left registered with IAM.
    #[tracing::instrument(skip_all, fields(account = %account))]
    pub async fn create_and_upload(
        &self,
        account: &ServiceAccount,
    ) -> Result<UploadOutcome, Error> {
        let key = self.identity.create_key(account).await?;
        info!(key = %key.name, "Created service account key");

        let key_file = key
            .private_key_data
            .as_ref()
            .ok_or_else(|| {
                Error::malformed_credential(format!(
                    "no private key data returned for {}",
                    key.name
                ))
            })?
            .decode()?;

        let secret = account.secret_name();
        let version = self.secrets.add_version(&secret, &key_file).await?;
        info!(version = %version.name, "Added secret version");

        let mut destroyed_versions = Vec::new();
        for old in self.secrets.list_versions(&secret).await? {
            if old.name == version.name || !old.is_enabled() {
                continue;
            }

            self.secrets.destroy_version(&old.name).await?;
            info!(version = %old.name, "Destroyed previous secret version");

            destroyed_versions.push(old.name);
        }

        Ok(UploadOutcome {
            key_name: key.name,
            version: version.name,
            destroyed_versions,
        })
    }

    /// Deletes every key of `account` other than the one stored in the
    /// latest secret version. System-managed keys are always kept.
    #[tracing::instrument(skip_all, fields(account = %account))]
    pub async fn prune_stale_keys(
        &self,
        account: &ServiceAccount,
    ) -> Result<PruneOutcome, Error> {
        let secret = account.secret_name();

        let latest = self
            .secrets
            .access_version(&version_name(&secret, LATEST))
            .await?;
        let CredentialDocument { private_key_id, .. } =
            CredentialDocument::from_slice(&latest.data)?;
        info!(
            version = %latest.name,
            key_id = %private_key_id,
            "Found current key in secret"
        );

        let mut deleted_keys = Vec::new();
        for key in self.identity.list_keys(account).await? {
            if key.key_id() == private_key_id || key.is_system_managed() {
                continue;
            }

            self.identity.delete_key(&key.name).await?;
            info!(key = %key.name, "Deleted stale key");

            deleted_keys.push(key.name);
        }

        Ok(PruneOutcome {
            retained_key_id: private_key_id,
            deleted_keys,
        })
    }

    /// [`Service::create_and_upload`] followed by [`Service::prune_stale_keys`].
    pub async fn rotate(&self, account: &ServiceAccount) -> Result<AccountReport, Error> {
        let created = self.create_and_upload(account).await?;
        let pruned = self.prune_stale_keys(account).await?;

        Ok(AccountReport {
            created: Some(created),
            pruned: Some(pruned),
            ..AccountReport::new(account)
        })
    }

    /// Applies `operation` to each account in order, stopping at the first
    /// failure.
    #[tracing::instrument(skip_all, fields(%operation, accounts = accounts.len()))]
    pub async fn dispatch(
        &self,
        accounts: &[ServiceAccount],
        operation: Operation,
    ) -> Result<Vec<AccountReport>, Error> {
        let mut reports = Vec::with_capacity(accounts.len());

        for account in accounts {
            let report = match operation {
                Operation::Create => AccountReport {
                    created: Some(self.create_and_upload(account).await?),
                    ..AccountReport::new(account)
                },
                Operation::Delete => AccountReport {
                    pruned: Some(self.prune_stale_keys(account).await?),
                    ..AccountReport::new(account)
                },
                Operation::All => self.rotate(account).await?,
            };

            reports.push(report);
        }

        Ok(reports)
    }
}
