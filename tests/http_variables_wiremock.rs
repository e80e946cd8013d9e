use anyhow::Result;
use nomad_acme_store::variables::{
    HttpVariablesClient, NomadClientConfig, Variable, VariablesApi, VariablesError,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpVariablesClient {
    HttpVariablesClient::new(NomadClientConfig {
        address: server.uri(),
        ..NomadClientConfig::default()
    })
}

#[tokio::test]
async fn get_variable_items_returns_items() -> Result<()> {
    let server = MockServer::start().await;

    let body = json!({
        "Namespace": "default",
        "Path": "traefik/acme/account",
        "CreateIndex": 10,
        "ModifyIndex": 12,
        "Items": { "account": "{\"Email\":\"test@example.com\"}" }
    });
    Mock::given(method("GET"))
        .and(path("/v1/var/traefik/acme/account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server)
        .get_variable_items("traefik/acme/account")
        .await?;
    assert_eq!(
        items.get("account").map(String::as_str),
        Some("{\"Email\":\"test@example.com\"}")
    );

    Ok(())
}

#[tokio::test]
async fn get_variable_items_maps_404_to_path_not_found() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/var/missing/account"))
        .respond_with(ResponseTemplate::new(404).set_body_string("variable not found"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_variable_items("missing/account")
        .await
        .unwrap_err();
    assert!(matches!(err, VariablesError::PathNotFound));

    Ok(())
}

#[tokio::test]
async fn server_errors_carry_status_and_body() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/var/traefik/acme/account"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Permission denied\n"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_variable_items("traefik/acme/account")
        .await
        .unwrap_err();
    match err {
        VariablesError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Permission denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn create_puts_single_item_with_token_and_namespace() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/var/traefik/acme/certificates"))
        .and(header("X-Nomad-Token", "secret-token"))
        .and(query_param("namespace", "edge"))
        .and(query_param("region", "eu"))
        .and(body_json(json!({
            "Path": "traefik/acme/certificates",
            "Items": { "certificates": "[]" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpVariablesClient::new(NomadClientConfig {
        address: server.uri(),
        token: Some(SecretString::from("secret-token")),
        namespace: Some("edge".to_string()),
        region: Some("eu".to_string()),
    });

    client
        .create(&Variable::single(
            "traefik/acme/certificates",
            "certificates",
            "[]",
        ))
        .await?;

    Ok(())
}

#[tokio::test]
async fn create_failure_is_reported() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/var/traefik/acme/account"))
        .respond_with(ResponseTemplate::new(500).set_body_string("raft apply failed"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create(&Variable::single("traefik/acme/account", "account", "{}"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "nomad returned 500: raft apply failed");

    Ok(())
}

#[tokio::test]
async fn reserved_characters_stay_in_the_path() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/var/traefik/a%3Fb%23c/account"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Items": { "account": "{}" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server)
        .get_variable_items("traefik/a?b#c/account")
        .await?;
    assert_eq!(items.get("account").map(String::as_str), Some("{}"));

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);

    Ok(())
}
