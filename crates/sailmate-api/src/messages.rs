use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use sailmate_types::api::{Claims, PageQuery, SendMessageRequest};

use crate::error::ApiError;
use crate::profile::page_number;
use crate::state::{AppState, with_db};

const MAX_MESSAGE_CHARS: usize = 2000;

/// Only the two users of a match may read or write its chat.
async fn require_participant(
    state: &AppState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let allowed = with_db(state, move |db| db.is_participant(match_id, user_id)).await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied".into()))
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(match_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content required".into()));
    }
    if req.content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::Validation(format!(
            "Message is longer than {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let sender_id = claims.sub;
    require_participant(&state, match_id, sender_id).await?;

    let content = req.content;
    let message =
        with_db(&state, move |db| db.append_message(match_id, sender_id, &content)).await?;
    debug!("Message {} posted to match {}", message.id, match_id);

    Ok((StatusCode::CREATED, Json(message)))
}

/// Page 0 is the newest 50 messages; each page is in chronological order.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(match_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_number(&query)?;
    require_participant(&state, match_id, claims.sub).await?;

    let messages = with_db(&state, move |db| db.list_messages(match_id, page)).await?;
    Ok(Json(messages))
}
