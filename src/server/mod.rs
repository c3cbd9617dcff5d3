//! HTTP API: routing, shared state and request handlers.
//!
//! # Endpoints
//!
//! - `GET /health`: health check (no auth)
//! - `POST /api/register`, `POST /api/login` (no auth)
//! - `GET|POST /api/recipes`, `GET|PUT|DELETE /api/recipes/{id}`
//! - `PUT /api/profile`
//! - `POST /api/generate-recipes`, `POST /api/generate-recipe-process`
//! - `POST /api/recipes/sync/pull`, `POST /api/recipes/sync/push`

pub mod auth;
pub mod error;
pub mod generate;
pub mod recipes;
pub mod sync;
pub mod tokens;
pub mod users;

use axum::{
    extract::FromRequest,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{RecipeRepository, UserRepository};
use error::ApiError;
use generate::GenerationClient;
use sync::SyncReconciler;
use tokens::TokenIssuer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub recipes: RecipeRepository,
    pub sync: SyncReconciler,
    pub tokens: TokenIssuer,
    pub generator: GenerationClient,
}

impl AppState {
    pub fn new(pool: SqlitePool, tokens: TokenIssuer, generator: GenerationClient) -> Self {
        let recipes = RecipeRepository::new(pool.clone());
        Self {
            users: UserRepository::new(pool),
            sync: SyncReconciler::new(recipes.clone()),
            recipes,
            tokens,
            generator,
        }
    }

    pub fn from_config(pool: SqlitePool, config: &Config) -> Self {
        Self::new(
            pool,
            TokenIssuer::new(&config.jwt_secret),
            GenerationClient::from_config(config),
        )
    }
}

/// JSON body extractor that rejects with an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/register", post(users::register_handler))
        .route("/api/login", post(users::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/api/profile", put(users::update_profile_handler))
        .route("/api/generate-recipes", post(generate::suggest_handler))
        .route(
            "/api/generate-recipe-process",
            post(generate::process_handler),
        )
        .route("/api/recipes/sync/pull", post(sync::pull_handler))
        .route("/api/recipes/sync/push", post(sync::push_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state);

    with_layers(app)
}

/// Outermost middleware: request tracing, permissive CORS, panic recovery.
fn with_layers(app: Router) -> Router {
    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// A handler panic becomes a plain 500 instead of tearing down the connection.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);
    ApiError::Internal("Internal server error".into()).into_response()
}


#[cfg(test)]
mod tests {
    use super::test_support::TestServer;
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn explode() -> &'static str {
        panic!("handler blew up")
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let app = with_layers(Router::new().route("/boom", get(explode)).route("/ok", get(health)));

        let request = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal server error");

        // The service keeps answering after a panic
        let request = Request::builder().uri("/ok").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let server = TestServer::new().await;

        let response = server.get("/health", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "ok");
        assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let server = TestServer::new().await;

        let response = server.get("/api/nope", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
