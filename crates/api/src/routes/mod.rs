//! HTTP routing

mod export;
mod health;
mod quick_replies;
mod sessions;
mod sop;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::AppState;
use crate::ws::ws_handler;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Sessions
        .route("/sessions", post(sessions::start_session))
        .route("/sessions/active", get(sessions::active_sessions))
        .route("/sessions/:code/messages", get(sessions::session_messages))
        .route("/sessions/:code/transfer", post(sessions::transfer_session))
        .route("/sessions/:code/end", post(sessions::end_session))
        // Knowledge base
        .route("/sop", post(sop::create_sop).get(sop::list_sops))
        .route("/sop/search", get(sop::search_sops))
        .route("/sop/category/:category", get(sop::sops_by_category))
        .route("/sop/:id", put(sop::update_sop).delete(sop::delete_sop))
        // Quick replies
        .route(
            "/quick-replies",
            post(quick_replies::create_quick_reply).get(quick_replies::list_quick_replies),
        )
        .route(
            "/quick-replies/category/:category",
            get(quick_replies::quick_replies_by_category),
        )
        .route("/quick-replies/:id", delete(quick_replies::delete_quick_reply))
        // Export
        .route("/export/conversations", get(export::export_conversations));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/ws/chat", get(ws_handler))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use chatdesk_shared::{MemoryStore, Store};

    fn test_state() -> AppState {
        let config = Config {
            bind_address: "127.0.0.1:0".into(),
            public_url: "http://localhost:3000".into(),
            database_url: None,
            database_max_connections: 5,
            cors_allowed_origins: Vec::new(),
        };
        AppState::new(config, Arc::new(MemoryStore::new()) as Arc<dyn Store>)
    }

    #[tokio::test]
    async fn test_health_endpoint_responds_ok() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_reflects_store_ping() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_session_without_agents_is_503() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"customerName":"Jane","customerEmail":"jane@x.com"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_session_messages_is_404() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sessions/CS-nope/messages")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
