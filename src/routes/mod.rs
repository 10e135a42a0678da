use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db,
    error::{AppError, AppResult},
    messages,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::MessageResponse,
};

pub mod auth;
pub mod comments;
pub mod likes;
pub mod photos;
pub mod state;
pub mod tags;
pub mod transform;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.cors_origin_list()))
        .with_state(state)
}

/// API routes under /api
fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthchecker", get(healthchecker))
        .merge(auth::routes(state))
        .merge(users::routes())
        .merge(photos::routes())
        .merge(likes::routes())
        .merge(comments::routes())
        .merge(transform::routes())
        .merge(tags::routes())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // credentialed CORS rejects wildcards, so methods and headers are listed
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new(messages::WELCOME_MESSAGE))
}

/// Checks that the database answers queries
async fn healthchecker(State(state): State<Arc<AppState>>) -> AppResult<Json<MessageResponse>> {
    match db::ping(&state.db_pool).await {
        Ok(true) => Ok(Json(MessageResponse::new(messages::WELCOME_MESSAGE))),
        Ok(false) => Err(AppError::Internal(messages::DB_CONFIG_ERROR.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            Err(AppError::Internal(messages::DB_CONNECT_ERROR.to_string()))
        }
    }
}
