//! IAM v1 REST implementation of [`IdentityService`].

use serde::Deserialize;

use crate::{
    gcp::{api_url, Empty, GoogleClient},
    identity::ServiceAccount,
    utils::BoxFuture,
};

use super::{IdentityService, ServiceAccountKey};

const SERVICE: &str = "iam";

/// Manages service-account keys through `iam.googleapis.com`.
pub struct GcpIdentityService {
    client: GoogleClient,
    endpoint: url::Url,
}

#[derive(Deserialize)]
struct ListKeysResponse {
    #[serde(default)]
    keys: Vec<ServiceAccountKey>,
}

impl GcpIdentityService {
    pub fn new(client: GoogleClient, endpoint: url::Url) -> Self {
        Self { client, endpoint }
    }
}

impl IdentityService for GcpIdentityService {
    fn create_key<'a>(&'a self, account: &'a ServiceAccount) -> BoxFuture<'a, ServiceAccountKey> {
        Box::pin(async move {
            let url = api_url(
                &self.endpoint,
                &format!("v1/{}/keys", account.resource_name()),
            );

            let request = self
                .client
                .http()
                .post(url)
                .json(&serde_json::json!({}));

            self.client.send(SERVICE, request).await
        })
    }

    fn list_keys<'a>(
        &'a self,
        account: &'a ServiceAccount,
    ) -> BoxFuture<'a, Vec<ServiceAccountKey>> {
        Box::pin(async move {
            let url = api_url(
                &self.endpoint,
                &format!("v1/{}/keys", account.resource_name()),
            );

            let ListKeysResponse { keys } = self
                .client
                .send(SERVICE, self.client.http().get(url))
                .await?;

            Ok(keys)
        })
    }

    fn delete_key<'a>(&'a self, key_name: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let url = api_url(&self.endpoint, &format!("v1/{key_name}"));

            let _: Empty = self
                .client
                .send(SERVICE, self.client.http().delete(url))
                .await?;

            Ok(())
        })
    }
}
