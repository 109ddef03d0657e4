use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tracing::debug;
use uuid::Uuid;

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::SchedulingService;
use shared_models::auth::{Role, User};

/// Headers set by the gateway after it has authenticated the caller.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub fn create_router(service: Arc<SchedulingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest(
            "/scheduling",
            scheduling_routes(service).layer(middleware::from_fn(identity_middleware)),
        )
}

/// Turns gateway identity headers into a `User` extension. Requests without
/// valid headers pass through unauthenticated and are refused by the handlers.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(user) = user_from_headers(&request) {
        debug!("Request from {} {}", user.role, user.id);
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

fn user_from_headers(request: &Request) -> Option<User> {
    let headers = request.headers();
    let id = headers.get(USER_ID_HEADER)?.to_str().ok()?.parse::<Uuid>().ok()?;
    let role = headers.get(USER_ROLE_HEADER)?.to_str().ok()?.parse::<Role>().ok()?;
    Some(User::new(id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use provider_cell::InMemoryProviderDirectory;
    use scheduling_cell::TracingEventSink;
    use shared_config::SchedulingConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let service = SchedulingService::in_memory(
            SchedulingConfig::default(),
            Arc::new(InMemoryProviderDirectory::new()),
            Arc::new(TracingEventSink),
        );
        create_router(Arc::new(service))
    }

    #[tokio::test]
    async fn test_identity_headers_authenticate_request() {
        let request = axum::http::Request::builder()
            .uri("/scheduling/slots?date=2025-06-23")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "patient")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_bad_headers_are_unauthorized() {
        let anonymous = axum::http::Request::builder()
            .uri("/scheduling/slots?date=2025-06-23")
            .body(Body::empty())
            .unwrap();
        let bad_role = axum::http::Request::builder()
            .uri("/scheduling/slots?date=2025-06-23")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "superuser")
            .body(Body::empty())
            .unwrap();

        for request in [anonymous, bad_role] {
            let response = app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
