use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use sailmate_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let matches = with_db(&state, move |db| db.list_matches(user_id)).await?;
    Ok(Json(matches))
}

/// Non-participants get the same 404 as an unknown id.
pub async fn get_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(match_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let found = with_db(&state, move |db| db.get_match_for(match_id, user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Match not found".into()))?;

    Ok(Json(found))
}
