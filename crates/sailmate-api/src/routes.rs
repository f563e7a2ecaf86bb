use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use sailmate_types::api::HealthResponse;

use crate::middleware::require_auth;
use crate::profile::MAX_PHOTO_SIZE;
use crate::state::AppState;
use crate::{auth, matches, messages, profile, swipes};

/// Body limit for JSON endpoints.
const BODY_LIMIT: usize = 10 * 1024 * 1024;
/// Room for multipart boundaries and headers around the photo bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full HTTP surface. Photos are served from `state.upload_dir`
/// under `/uploads`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/profile/{user_id}", get(profile::get_profile));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/profile", put(profile::update_profile))
        .route(
            "/api/profile/upload-photo",
            post(profile::upload_photo)
                .layer(DefaultBodyLimit::max(MAX_PHOTO_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/api/profile/discover/available", get(profile::discover))
        .route("/api/swipes", post(swipes::create_swipe))
        .route("/api/swipes/stats", get(swipes::stats))
        .route("/api/matches", get(matches::list_matches))
        .route("/api/matches/{match_id}", get(matches::get_match))
        .route(
            "/api/chat/{match_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let uploads = ServeDir::new(&state.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        timestamp: chrono::Utc::now(),
    })
}
