use anyhow::Context;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::{extract::FromRef, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use routes::{category_router, questions_router, quizzes_router};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::{handle_panic, ApiError};
use super::routes;
use crate::config::ServerSettings;

#[derive(FromRef, Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/metrics", get(metrics))
        .merge(category_router(state.clone()))
        .merge(questions_router(state.clone()))
        .merge(quizzes_router(state));
    with_api_layers(routes)
}

/// Fallbacks and middleware shared by every route in `routes`.
fn with_api_layers(routes: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    routes
        .fallback(|| async {
            tracing::info!("Fallback");
            ApiError::NotFound
        })
        // must come after every route is registered
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(pool: SqlitePool, settings: &ServerSettings) -> anyhow::Result<()> {
    let addr = settings.address();
    let app = build_router(AppState { pool });
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Serving on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    if let Err(e) = encoder.encode(&metrics, &mut buf) {
        return ApiError::internal(e).into_response();
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_owned())], buf).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::{routing::get as get_route, Router};
    use serde_json::json;
    use tower::ServiceExt;

    use super::with_api_layers;
    use crate::server::testing::{delete, get, post_json, seeded_app, send};

    async fn explode() -> StatusCode {
        panic!("handler blew up")
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _) = seeded_app().await;
        let (status, body) = send(&app, post_json("/search", json!({"searchTerm": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"success": false, "error": 404, "message": "resource not found"})
        );
    }

    #[tokio::test]
    async fn wrong_method_is_not_allowed() {
        let (app, _) = seeded_app().await;
        for request in [
            delete("/categories"),
            get("/quizzes"),
            post_json("/questions/5", json!({})),
        ] {
            let (status, body) = send(&app, request).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(
                body,
                json!({"success": false, "error": 405, "message": "method not allowed"})
            );
        }
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let (app, _) = seeded_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/categories")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_error() {
        let app = with_api_layers(Router::new().route("/explode", get_route(explode)));
        let (status, body) = send(&app, get("/explode")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": 500, "message": "internal server error"})
        );
    }

    #[tokio::test]
    async fn answers_cors_preflight() {
        let (app, _) = seeded_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/questions")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "DELETE")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        for method in ["GET", "PATCH", "POST", "DELETE", "OPTIONS"] {
            assert!(methods.contains(method), "{methods}");
        }
        let allowed = headers["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed.contains("content-type"));
        assert!(allowed.contains("authorization"));
    }

    #[tokio::test]
    async fn exposes_metrics() {
        let (app, _) = seeded_app().await;
        send(
            &app,
            post_json(
                "/quizzes",
                json!({"previous_questions": [], "quiz_category": {"id": 0}}),
            ),
        )
        .await;

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("quiz_questions_served_total"));
    }
}
