use base64::{engine::general_purpose::STANDARD, Engine};
use keyrot::{
    error::Error,
    gcp::{GoogleClient, TokenSource},
    iam::{gcp::GcpIdentityService, IdentityService, KeyType},
    identity::ServiceAccount,
    secrets::{gcp::GcpSecretService, version_name, SecretService, VersionState, LATEST},
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

const EMAIL: &str = "rotator@my-project.iam.gserviceaccount.com";
const SA_PATH: &str = "/v1/projects/-/serviceAccounts/rotator@my-project.iam.gserviceaccount.com";
const SECRET: &str = "projects/my-project/secrets/rotator";

fn client() -> GoogleClient {
    GoogleClient::new(
        reqwest::Client::new(),
        TokenSource::fixed(SecretString::from("test-token".to_owned())),
    )
}

fn endpoint(server: &MockServer) -> url::Url {
    url::Url::parse(&server.uri()).unwrap()
}

fn account() -> ServiceAccount {
    ServiceAccount::parse(EMAIL).unwrap()
}

#[tokio::test]
async fn test_create_key() {
    let server = MockServer::start().await;

    let key_file = json!({
        "type": "service_account",
        "private_key_id": "0123abcd",
        "client_email": EMAIL,
    });

    Mock::given(method("POST"))
        .and(path(format!("{SA_PATH}/keys")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("projects/my-project/serviceAccounts/{EMAIL}/keys/0123abcd"),
            "privateKeyType": "TYPE_GOOGLE_CREDENTIALS_FILE",
            "privateKeyData": STANDARD.encode(key_file.to_string()),
            "validAfterTime": "2024-01-01T00:00:00Z",
            "keyType": "USER_MANAGED",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let iam = GcpIdentityService::new(client(), endpoint(&server));
    let key = iam.create_key(&account()).await.unwrap();

    assert_eq!(key.key_id(), "0123abcd");
    assert_eq!(key.key_type, KeyType::UserManaged);
    assert!(key.valid_after_time.is_some());

    let data = key.private_key_data.unwrap().decode().unwrap();
    let doc = keyrot::credential::CredentialDocument::from_slice(&data).unwrap();
    assert_eq!(doc.private_key_id, "0123abcd");
}

#[tokio::test]
async fn test_list_and_delete_keys() {
    let server = MockServer::start().await;
    let key_prefix = format!("projects/my-project/serviceAccounts/{EMAIL}/keys");

    Mock::given(method("GET"))
        .and(path(format!("{SA_PATH}/keys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                { "name": format!("{key_prefix}/aaa"), "keyType": "SYSTEM_MANAGED" },
                { "name": format!("{key_prefix}/bbb"), "keyType": "USER_MANAGED" },
                { "name": format!("{key_prefix}/ccc"), "keyType": "SOMETHING_NEW" },
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v1/{key_prefix}/bbb")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let iam = GcpIdentityService::new(client(), endpoint(&server));

    let keys = iam.list_keys(&account()).await.unwrap();
    let types: Vec<_> = keys.iter().map(|k| k.key_type).collect();
    assert_eq!(
        types,
        vec![KeyType::SystemManaged, KeyType::UserManaged, KeyType::Unknown]
    );

    iam.delete_key(&keys[1].name).await.unwrap();
}

#[tokio::test]
async fn test_empty_key_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{SA_PATH}/keys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let iam = GcpIdentityService::new(client(), endpoint(&server));
    assert!(iam.list_keys(&account()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SA_PATH}/keys")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "Permission 'iam.serviceAccountKeys.create' denied",
                "status": "PERMISSION_DENIED",
            }
        })))
        .mount(&server)
        .await;

    let iam = GcpIdentityService::new(client(), endpoint(&server));

    match iam.create_key(&account()).await {
        Err(Error::Upstream {
            service,
            status,
            message,
        }) => {
            assert_eq!(service, "iam");
            assert_eq!(status, 403);
            assert!(message.starts_with("PERMISSION_DENIED"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_add_version() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/{SECRET}:addVersion")))
        .and(body_json(json!({ "payload": { "data": STANDARD.encode("hello") } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("{SECRET}/versions/3"),
            "createTime": "2024-01-01T00:00:00.123456Z",
            "state": "ENABLED",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sm = GcpSecretService::new(client(), endpoint(&server));
    let version = sm.add_version(SECRET, b"hello").await.unwrap();

    assert_eq!(version.version_id(), "3");
    assert!(version.is_enabled());
    assert!(version.create_time.is_some());
}

#[tokio::test]
async fn test_list_versions_follows_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/{SECRET}/versions")))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "versions": [
                { "name": format!("{SECRET}/versions/3"), "state": "ENABLED" },
                { "name": format!("{SECRET}/versions/2"), "state": "DISABLED" },
            ],
            "nextPageToken": "page-2",
            "totalSize": 3,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/{SECRET}/versions")))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "versions": [
                { "name": format!("{SECRET}/versions/1"), "state": "DESTROYED" },
            ],
            "totalSize": 3,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sm = GcpSecretService::new(client(), endpoint(&server));
    let versions = sm.list_versions(SECRET).await.unwrap();

    let states: Vec<_> = versions.iter().map(|v| v.state).collect();
    assert_eq!(
        states,
        vec![
            VersionState::Enabled,
            VersionState::Disabled,
            VersionState::Destroyed
        ]
    );
}

#[tokio::test]
async fn test_access_and_destroy_version() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/{SECRET}/versions/latest:access")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("{SECRET}/versions/3"),
            "payload": { "data": STANDARD.encode(r#"{"private_key_id":"abc"}"#) },
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/v1/{SECRET}/versions/2:destroy")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": format!("{SECRET}/versions/2"),
            "state": "DESTROYED",
            "destroyTime": "2024-01-02T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sm = GcpSecretService::new(client(), endpoint(&server));

    let payload = sm
        .access_version(&version_name(SECRET, LATEST))
        .await
        .unwrap();
    assert_eq!(payload.name, format!("{SECRET}/versions/3"));
    assert_eq!(&payload.data[..], br#"{"private_key_id":"abc"}"#);

    let destroyed = sm
        .destroy_version(&format!("{SECRET}/versions/2"))
        .await
        .unwrap();
    assert_eq!(destroyed.state, VersionState::Destroyed);
}

#[tokio::test]
async fn test_metadata_token_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(
            "/computeMetadata/v1/instance/service-accounts/default/token",
        ))
        .and(header("metadata-flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "from-metadata",
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SA_PATH}/keys")))
        .and(header("authorization", "Bearer from-metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let client = GoogleClient::new(
        reqwest::Client::new(),
        TokenSource::metadata(endpoint(&server)),
    );
    let iam = GcpIdentityService::new(client, endpoint(&server));

    iam.list_keys(&account()).await.unwrap();
    iam.list_keys(&account()).await.unwrap();
}
