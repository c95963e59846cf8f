use stokercloud::{MetricKind, MetricValue, StokerClient, Strategy};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> StokerClient {
    StokerClient::builder("8765", "secret")
        .base_url(server.uri())
        .build()
}

fn boiler_temp_descriptor() -> stokercloud::MetricDescriptor {
    stokercloud::MetricDescriptor::new("boiler_temperature", MetricKind::Temperature).strategy(
        Strategy::TaggedScan {
            group: "frontdata".into(),
            id: "boilertemp".into(),
        },
    )
}

#[tokio::test]
async fn fetch_sends_serial_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/controllerdata2.php"))
        .and(query_param("serial", "8765"))
        .and(query_param("token", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"frontdata": [{"id": "boilertemp", "value": "62,5"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let payload = client.fetch().await.expect("fetch should succeed");
    assert_eq!(payload["frontdata"][0]["id"], "boilertemp");
}

#[tokio::test]
async fn fetch_non_2xx_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/controllerdata2.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, stokercloud::Error::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn fetch_repairs_trailing_commas() {
    let server = MockServer::start().await;
    // Some installations emit trailing commas before closing brackets.
    let body = r#"{"frontdata": [{"id": "boilertemp", "value": "62,5",},],}"#;
    Mock::given(method("GET"))
        .and(path("/controllerdata2.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let value = client
        .read_metric(&boiler_temp_descriptor())
        .await
        .expect("repaired body should decode");
    assert_eq!(value, MetricValue::Number(62.5));
}

#[tokio::test]
async fn fetch_garbage_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/controllerdata2.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json at all"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, stokercloud::Error::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn read_metric_missing_field_is_unset_not_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/controllerdata2.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"otherdata": []})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let value = client
        .read_metric(&boiler_temp_descriptor())
        .await
        .expect("absent field is a successful read");
    assert_eq!(value, MetricValue::Unset);
}

#[tokio::test]
async fn write_sends_full_query_and_succeeds_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .and(query_param("menu", "boiler.temp"))
        .and(query_param("name", "boiler.temp"))
        .and(query_param("value", "75"))
        .and(query_param("token", "secret"))
        .and(query_param("serial", "8765"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.write("boiler.temp", "boiler.temp", "75").await);
}

#[tokio::test]
async fn write_500_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(!client.write("boiler.temp", "boiler.temp", "75").await);
}

#[tokio::test]
async fn write_failure_body_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "error", "msg": "bad token"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(!client.write("boiler.temp", "boiler.temp", "75").await);
}

#[tokio::test]
async fn write_echoed_value_body_is_success() {
    // Endpoints with no status convention echo the written value; that must
    // not read as failure.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("75"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.write("boiler.temp", "boiler.temp", "75").await);
}

#[tokio::test]
async fn write_transport_error_returns_false() {
    let client = StokerClient::builder("8765", "secret")
        .base_url("http://127.0.0.1:9")
        .timeout(std::time::Duration::from_millis(500))
        .build();
    assert!(!client.write("boiler.temp", "boiler.temp", "75").await);
}

#[tokio::test]
async fn set_power_uses_misc_commands() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .and(query_param("name", "misc.start"))
        .and(query_param("value", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/updatevalue.php"))
        .and(query_param("name", "misc.stop"))
        .and(query_param("value", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.set_power(true).await);
    assert!(client.set_power(false).await);
}
