use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use provider_cell::{CareProvider, InMemoryProviderDirectory};
use scheduling_cell::router::scheduling_routes;
use scheduling_cell::{SchedulingService, TracingEventSink};
use shared_config::SchedulingConfig;
use shared_models::auth::{Role, User};

fn app(providers: Vec<CareProvider>) -> Router {
    let service = SchedulingService::in_memory(
        SchedulingConfig::default(),
        Arc::new(InMemoryProviderDirectory::with_providers(providers)),
        Arc::new(TracingEventSink),
    );
    scheduling_routes(Arc::new(service))
}

fn request(method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let mut req = builder.body(body).unwrap();
    if let Some(user) = user {
        req.extensions_mut().insert(user.clone());
    }
    req
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn booking(time: &str) -> Value {
    json!({
        "symptoms": "Migraine",
        "priority": "high",
        "health_issue_category": "physical",
        "date": "2025-06-23",
        "time": time
    })
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let app = app(vec![]);

    let (status, body) = send(&app, request(Method::GET, "/slots?date=2025-06-23", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Authentication"));
}

#[tokio::test]
async fn test_slots_endpoint_lists_weekday_grid() {
    let app = app(vec![]);
    let requester = User::new(Uuid::new_v4(), Role::Requester);

    let (status, body) = send(&app, request(Method::GET, "/slots?date=2025-06-23", Some(&requester), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 18);
    assert_eq!(body["slots"][0]["start_time"], "09:00:00");
    assert_eq!(body["slots"][0]["end_time"], "09:20:00");

    let (_, weekend) = send(&app, request(Method::GET, "/slots?date=2025-06-28", Some(&requester), None)).await;
    assert_eq!(weekend["total"], 0);
}

#[tokio::test]
async fn test_book_then_conflict_maps_to_409() {
    let app = app(vec![]);
    let requester = User::new(Uuid::new_v4(), Role::Requester);
    let staff = User::new(Uuid::new_v4(), Role::Staff);

    let (status, body) = send(
        &app,
        request(Method::POST, "/appointments", Some(&requester), Some(booking("09:40:00"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["requested_time"], "09:40:00");

    let mut explicit = booking("09:40:00");
    explicit["requester_id"] = json!(Uuid::new_v4());
    let (status, body) = send(&app, request(Method::POST, "/appointments", Some(&staff), Some(explicit))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_approve_and_reject_flow_over_http() {
    let app = app(vec![]);
    let requester = User::new(Uuid::new_v4(), Role::Requester);
    let staff = User::new(Uuid::new_v4(), Role::Staff);

    let (_, created) = send(
        &app,
        request(Method::POST, "/appointments", Some(&requester), Some(booking("10:00:00"))),
    )
    .await;
    let id = created["appointment"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/appointments/{}/approve", id), Some(&requester), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/appointments/{}/reject", id), Some(&staff), Some(json!({ "reason": "Outside remit" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], "rejected");
    assert_eq!(body["appointment"]["rejection_reason"], "Outside remit");

    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/appointments/{}/approve", id), Some(&staff), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_get_and_delete_appointment() {
    let app = app(vec![]);
    let requester = User::new(Uuid::new_v4(), Role::Requester);

    let (_, created) = send(
        &app,
        request(Method::POST, "/appointments", Some(&requester), Some(booking("13:00:00"))),
    )
    .await;
    let id = created["appointment"]["id"].as_str().unwrap().to_string();
    let uri = format!("/appointments/{}", id);

    let (status, body) = send(
        &app,
        request(Method::PATCH, &uri, Some(&requester), Some(json!({ "status": "archived" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pending, approved"));

    let (status, body) = send(
        &app,
        request(Method::PATCH, &uri, Some(&requester), Some(json!({ "symptoms": "Migraine with aura" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["symptoms"], "Migraine with aura");

    let stranger = User::new(Uuid::new_v4(), Role::Requester);
    let (status, _) = send(&app, request(Method::GET, &uri, Some(&stranger), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&requester), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request(Method::GET, &uri, Some(&requester), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blackout_endpoints_are_admin_only() {
    let app = app(vec![]);
    let admin = User::new(Uuid::new_v4(), Role::Admin);
    let staff = User::new(Uuid::new_v4(), Role::Staff);
    let requester = User::new(Uuid::new_v4(), Role::Requester);

    let (_, created) = send(
        &app,
        request(Method::POST, "/appointments", Some(&requester), Some(json!({
            "symptoms": "Anxiety",
            "health_issue_category": "mental",
            "date": "2025-12-25",
            "time": "09:00:00"
        }))),
    )
    .await;
    let id = created["appointment"]["id"].clone();

    let blackout = json!({ "date": "2025-12-25", "reason": "Public holiday", "category": "holiday" });
    let (status, _) = send(&app, request(Method::POST, "/blackouts", Some(&staff), Some(blackout.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request(Method::POST, "/blackouts", Some(&admin), Some(blackout))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["cancelled_appointment_ids"], json!([id]));

    let (_, listed) = send(&app, request(Method::GET, "/blackouts", Some(&requester), None)).await;
    assert_eq!(listed["total"], 1);

    let (_, slots) = send(&app, request(Method::GET, "/slots?date=2025-12-25", Some(&requester), None)).await;
    assert_eq!(slots["total"], 0);

    let (status, _) = send(&app, request(Method::DELETE, "/blackouts/2025-12-25", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request(Method::DELETE, "/blackouts/2025-12-25", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pending_queue_and_listing_respect_roles() {
    let staff_user = User::new(Uuid::new_v4(), Role::Staff);
    let provider = CareProvider::new(staff_user.id, "Dr. Ade", "physical");
    let app = app(vec![provider]);
    let requester = User::new(Uuid::new_v4(), Role::Requester);

    for time in ["09:00:00", "09:20:00"] {
        send(&app, request(Method::POST, "/appointments", Some(&requester), Some(booking(time)))).await;
    }

    let (status, _) = send(&app, request(Method::GET, "/appointments/pending", Some(&requester), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, queue) = send(&app, request(Method::GET, "/appointments/pending", Some(&staff_user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["total"], 2);
    assert_eq!(queue["appointments"][0]["assigned_staff_id"], json!(staff_user.id));

    let (_, mine) = send(&app, request(Method::GET, "/appointments?status=pending", Some(&requester), None)).await;
    assert_eq!(mine["total"], 2);
    let (_, other) = send(
        &app,
        request(Method::GET, "/appointments", Some(&User::new(Uuid::new_v4(), Role::Requester)), None),
    )
    .await;
    assert_eq!(other["total"], 0);
}
