//! Secret Manager v1 REST implementation of [`SecretService`].

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::{
    error::Error,
    gcp::{api_url, GoogleClient},
    utils::BoxFuture,
};

use super::{SecretPayload, SecretService, SecretVersion};

const SERVICE: &str = "secretmanager";

pub struct GcpSecretService {
    client: GoogleClient,
    endpoint: url::Url,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListVersionsResponse {
    #[serde(default)]
    versions: Vec<SecretVersion>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct AccessResponse {
    name: String,
    payload: Payload,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    data: Zeroizing<String>,
}

impl GcpSecretService {
    pub fn new(client: GoogleClient, endpoint: url::Url) -> Self {
        Self { client, endpoint }
    }
}

impl SecretService for GcpSecretService {
    fn add_version<'a>(&'a self, secret: &'a str, payload: &'a [u8]) -> BoxFuture<'a, SecretVersion> {
        Box::pin(async move {
            let url = api_url(&self.endpoint, &format!("v1/{secret}:addVersion"));

            let body = serde_json::json!({
                "payload": { "data": STANDARD.encode(payload) },
            });

            self.client
                .send(SERVICE, self.client.http().post(url).json(&body))
                .await
        })
    }

    fn list_versions<'a>(&'a self, secret: &'a str) -> BoxFuture<'a, Vec<SecretVersion>> {
        Box::pin(async move {
            let url = api_url(&self.endpoint, &format!("v1/{secret}/versions"));

            let mut versions = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let mut request = self.client.http().get(&url);
                if let Some(token) = &page_token {
                    request = request.query(&[("pageToken", token)]);
                }

                let page: ListVersionsResponse = self.client.send(SERVICE, request).await?;
                versions.extend(page.versions);

                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }

            Ok(versions)
        })
    }

    fn access_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretPayload> {
        Box::pin(async move {
            let url = api_url(&self.endpoint, &format!("v1/{version}:access"));

            let AccessResponse { name, payload } = self
                .client
                .send(SERVICE, self.client.http().get(url))
                .await?;

            let data = STANDARD.decode(payload.data.as_bytes()).map_err(|e| {
                Error::internal(eyre::eyre!("invalid payload encoding for {name}: {e}"))
            })?;

            Ok(SecretPayload {
                name,
                data: Zeroizing::new(data),
            })
        })
    }

    fn destroy_version<'a>(&'a self, version: &'a str) -> BoxFuture<'a, SecretVersion> {
        Box::pin(async move {
            let url = api_url(&self.endpoint, &format!("v1/{version}:destroy"));

            self.client
                .send(
                    SERVICE,
                    self.client.http().post(url).json(&serde_json::json!({})),
                )
                .await
        })
    }
}
