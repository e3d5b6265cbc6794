use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::router::clinic_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestIdentity};

fn create_test_app(config: AppConfig) -> Router {
    clinic_routes(Arc::new(config))
}

async fn mount_account_probe(server: &MockServer, identity: &TestIdentity) {
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("id", format!("eq.{}", identity.id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockStoreResponses::account_status_row(identity.id, true)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn admin_creates_a_clinic() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let admin = TestIdentity::admin("admin@clinic.test");
    mount_account_probe(&mock_server, &admin).await;

    let clinic_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/clinics"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::clinic_row(clinic_id, "Clinica Central")
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "name": "Clinica Central", "city": "Buenos Aires" }).to_string(),
        ))
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["name"], "Clinica Central");
    assert_eq!(created["id"], json!(clinic_id));
}

#[tokio::test]
async fn non_admin_cannot_create_a_clinic() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let doctor = TestIdentity::doctor("doc@clinic.test");
    mount_account_probe(&mock_server, &doctor).await;

    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Rogue Clinic" }).to_string()))
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_clinic_returns_the_row() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient = TestIdentity::patient("pat@example.test");
    mount_account_probe(&mock_server, &patient).await;

    let clinic_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::clinic_row(clinic_id, "Clinica Norte")
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}", clinic_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_clinic_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let admin = TestIdentity::admin("admin@clinic.test");
    mount_account_probe(&mock_server, &admin).await;

    Mock::given(method("GET"))
        .and(path("/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockStoreResponses::empty_rows()))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_clinics_paginates() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let doctor = TestIdentity::doctor("doc@clinic.test");
    mount_account_probe(&mock_server, &doctor).await;

    Mock::given(method("GET"))
        .and(path("/clinics"))
        .and(query_param("limit", "10"))
        .and(query_param("offset", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::clinic_row(Uuid::new_v4(), "Clinica Sur"),
            MockStoreResponses::clinic_row(Uuid::new_v4(), "Clinica Oeste")
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("GET")
        .uri("/?limit=10&offset=20")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let listed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.as_array().map(|rows| rows.len()), Some(2));
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let config = TestConfig::default();

    for (verb, uri) in [("POST", "/"), ("GET", "/"), ("GET", "/00000000-0000-0000-0000-000000000000")] {
        let request = Request::builder()
            .method(verb)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = create_test_app(config.to_app_config())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", verb, uri);
    }
}
