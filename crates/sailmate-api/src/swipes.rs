use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use sailmate_types::api::{Claims, SwipeRequest};
use sailmate_types::models::SwipeDirection;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// POST /api/swipes: returns `{matched, matchId?}`.
///
/// A repeated swipe on the same user is a 409; it never overwrites the
/// original decision.
pub async fn create_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SwipeRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let target: Uuid = req
        .target_user_id
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("Invalid request: targetUserId".into()))?;
    let direction: SwipeDirection = req
        .direction
        .parse()
        .map_err(|_| {
            ApiError::Validation("Invalid request: direction must be 'left' or 'right'".into())
        })?;

    if target == claims.sub {
        return Err(ApiError::Validation("Cannot swipe on yourself".into()));
    }

    let actor = claims.sub;
    let outcome = with_db(&state, move |db| db.record_swipe(actor, target, direction))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => ApiError::Conflict("Already swiped on this user".into()),
            other => other,
        })?;

    if let Some(match_id) = outcome.match_id {
        info!("{} and {} matched ({})", actor, target, match_id);
    }

    Ok(Json(outcome))
}

/// GET /api/swipes/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let stats = with_db(&state, move |db| db.swipe_stats(user_id)).await?;
    Ok(Json(stats))
}
