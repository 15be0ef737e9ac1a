pub mod api;
pub mod error;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use exp_adapter::{Experience, ExperienceOptions, PersonalizationService};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Max request body size: 1 MiB
const MAX_BODY_BYTES: usize = 1_048_576;
/// Request timeout; must outlast the resolve long-poll window.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub experience: Arc<Experience>,
}

/// Production router: outbound calls go to the configured service URL.
pub fn app() -> Router {
    let service = Arc::new(exp_adapter::HttpPersonalizationService::new(
        exp_config::SERVICE_URL.as_str(),
    ));
    app_with(service)
}

/// Build the router around an explicit service implementation.
pub fn app_with(service: Arc<dyn PersonalizationService>) -> Router {
    let experience = Arc::new(Experience::with_options(
        service,
        ExperienceOptions {
            resolve_timeout: Duration::from_millis(*exp_config::RESOLVE_TIMEOUT_MS),
        },
    ));
    let state = AppState { experience };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/load", post(api::load))
        .route("/v1/resolve", post(api::resolve))
        .route("/v1/slots", get(api::slots))
        .route("/v1/pending", get(api::pending))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(require_json_content_type))
        .with_state(state)
}

/// Middleware: reject POST/PUT requests without application/json content-type.
async fn require_json_content_type(req: Request, next: Next) -> Response {
    let dominated_by_json = match req.method().as_str() {
        "POST" | "PUT" | "PATCH" => req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false),
        _ => true, // GET, DELETE, etc. don't need content-type
    };
    if !dominated_by_json {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({"error": "content-type must be application/json"})),
        )
            .into_response();
    }
    next.run(req).await
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

pub mod test {
    use super::*;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// Spawn the gate on a random port around the given service double.
    /// Returns the address and a JoinHandle that keeps the server alive
    /// until dropped.
    pub async fn spawn_with(
        service: Arc<dyn PersonalizationService>,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = super::app_with(service);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, handle)
    }
}
