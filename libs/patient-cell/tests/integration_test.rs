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

use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestIdentity};

fn create_test_app(config: AppConfig) -> Router {
    patient_routes(Arc::new(config))
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

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn doctor_creates_a_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let doctor = TestIdentity::doctor("doc@clinic.test");
    mount_account_probe(&mock_server, &doctor).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::patient_row(patient_id, None)
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", bearer(&token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "Bruno Diaz" }).to_string()))
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
    assert_eq!(created["id"], json!(patient_id));
}

#[tokio::test]
async fn patient_cannot_list_patients() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient = TestIdentity::patient("pat@example.test");
    mount_account_probe(&mock_server, &patient).await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", bearer(&token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patient_reads_their_linked_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient = TestIdentity::patient("pat@example.test");
    mount_account_probe(&mock_server, &patient).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/patients"))
        .and(query_param("user_id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::patient_row(patient_id, Some(patient.id))
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("authorization", bearer(&token))
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
    let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["id"], json!(patient_id));
}

#[tokio::test]
async fn patient_updates_their_own_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient = TestIdentity::patient("pat@example.test");
    mount_account_probe(&mock_server, &patient).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::patient_row(patient_id, Some(patient.id))
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::patient_row(patient_id, Some(patient.id))
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("PATCH")
        .uri(&format!("/{}", patient_id))
        .header("authorization", bearer(&token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "phone": "+54 11 5555-0101" }).to_string()))
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unrelated_patient_cannot_update_the_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let patient = TestIdentity::patient("pat@example.test");
    mount_account_probe(&mock_server, &patient).await;

    let patient_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::patient_row(patient_id, Some(Uuid::new_v4()))
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("PATCH")
        .uri(&format!("/{}", patient_id))
        .header("authorization", bearer(&token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "notes": "spoofed" }).to_string()))
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn doctor_cannot_delete_a_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let doctor = TestIdentity::doctor("doc@clinic.test");
    mount_account_probe(&mock_server, &doctor).await;

    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/{}", Uuid::new_v4()))
        .header("authorization", bearer(&token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unassign_succeeds_even_without_a_link() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let doctor = TestIdentity::doctor("doc@clinic.test");
    mount_account_probe(&mock_server, &doctor).await;

    Mock::given(method("DELETE"))
        .and(path("/clinic_patients"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));
    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/{}/clinics/{}", Uuid::new_v4(), Uuid::new_v4()))
        .header("authorization", bearer(&token))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(config.to_app_config())
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
