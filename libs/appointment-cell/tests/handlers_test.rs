mod common;

use axum::{
    body::{to_bytes, Body},
    extract::{Extension, Path, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::handlers::*;
use appointment_cell::models::*;
use appointment_cell::appointment_routes;
use shared_models::{auth::User, error::AppError};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use common::{Fixture, COMPANY};

fn staff() -> Extension<User> {
    Extension(TestUser::staff("staff@example.com", COMPANY).to_user())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_schedule_handler_returns_created() {
    let fixture = Fixture::new().await;

    let (status, Json(body)) = schedule_appointment(
        State(fixture.state.clone()),
        staff(),
        Json(fixture.request_at("2024-06-01 12:00")),
    )
    .await
    .expect("handler should succeed");

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["appointment"]["code"], "#APT001");
    assert_eq!(body["appointment"]["status"], "Upcoming");
    assert_eq!(body["payment_code"], "#TXN001");
    assert_eq!(body["expire_time"], "2024-06-01T12:30:00+05:30");
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let fixture = Fixture::new().await;
    let mut request = fixture.request_at("2024-06-01 12:00");
    request.client_id = "CL404".to_string();

    let error = schedule_appointment(State(fixture.state.clone()), staff(), Json(request))
        .await
        .unwrap_err();

    assert!(matches!(error, AppError::NotFound(ref msg) if msg == "Client not found"));
    assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_time_is_bad_request() {
    let fixture = Fixture::new().await;

    let error = schedule_appointment(
        State(fixture.state.clone()),
        staff(),
        Json(fixture.request_at("31/31/2024")),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_without_company_is_forbidden() {
    let fixture = Fixture::new().await;
    let user = TestUser::without_company("nobody@example.com").to_user();

    let error = schedule_appointment(
        State(fixture.state.clone()),
        Extension(user),
        Json(fixture.request_at("2024-06-01 12:00")),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancelling_ongoing_is_conflict() {
    let fixture = Fixture::new().await;
    let (_, Json(body)) = schedule_appointment(
        State(fixture.state.clone()),
        staff(),
        Json(fixture.request_at("2024-06-01 09:45")),
    )
    .await
    .unwrap();
    let appointment_id: Uuid = serde_json::from_value(body["appointment"]["id"].clone()).unwrap();

    let error = update_appointment(
        State(fixture.state.clone()),
        Path(appointment_id),
        staff(),
        Json(UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(error.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_infrastructure_errors_are_generic() {
    let response = AppError::Database("relation \"appointments\" does not exist".to_string()).into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn test_reconcile_requires_admin() {
    let fixture = Fixture::new().await;

    let error = reconcile_statuses(State(fixture.state.clone()), staff())
        .await
        .unwrap_err();
    assert_eq!(error.status_code(), StatusCode::FORBIDDEN);

    let (_, Json(created)) = schedule_appointment(
        State(fixture.state.clone()),
        staff(),
        Json(fixture.request_at("2024-06-01 12:00")),
    )
    .await
    .unwrap();
    assert_eq!(created["appointment"]["status"], "Upcoming");

    fixture.clock.advance(chrono::Duration::hours(2));

    let admin = Extension(TestUser::admin("owner@example.com", COMPANY).to_user());
    let Json(body) = reconcile_statuses(State(fixture.state.clone()), admin)
        .await
        .unwrap();
    assert_eq!(body["result"]["ongoing"], 1);
}

#[tokio::test]
async fn test_routes_require_bearer_token() {
    let fixture = Fixture::new().await;
    let app = appointment_routes(fixture.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_routes_schedule_and_fetch_with_valid_token() {
    let fixture = Fixture::new().await;
    let config = TestConfig::default();
    let token = JwtTestUtils::create_test_token(
        &TestUser::staff("staff@example.com", COMPANY),
        &config.jwt_secret,
        None,
    );

    let request_body = json!({
        "client_id": "cl001",
        "employee_id": fixture.employee_id,
        "service_id": fixture.service_id,
        "date": "2024-06-01",
        "time": "12:00",
        "paid_status": "paid"
    });

    let response = appointment_routes(fixture.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["appointment"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["appointment"]["paid_status"], "paid");

    let response = appointment_routes(fixture.state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/{}", id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["appointment"]["code"], "#APT001");

    let response = appointment_routes(fixture.state.clone())
        .oneshot(
            Request::builder()
                .uri("/notifications")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let notifications = body_json(response).await;
    assert_eq!(notifications["notifications"].as_array().unwrap().len(), 1);
}
