mod docs;
mod error;
mod middleware;
mod state;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::header::{ACCEPT, CONTENT_TYPE},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes();

    Router::new()
        .route("/", get(routes::health::home))
        .route("/health", get(routes::health::health_check))
        .route("/api/signup", post(routes::auth::signup))
        .route("/api/signin", post(routes::auth::signin))
        .route("/api/styles", get(routes::style::list_styles))
        .route("/api/style/:style", post(routes::style::stylize))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(cors_layer())
        .layer(axum_middleware::from_fn(middleware::log_requests))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE])
}
