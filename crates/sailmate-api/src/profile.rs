use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use sailmate_db::ProfileUpdate;
use sailmate_types::api::{
    Claims, NumberOrText, PageQuery, PhotoUploadResponse, UpdateProfileRequest,
};
use sailmate_types::models::SailingLevel;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// 5 MB upload limit for photos
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

const MIN_AGE: i64 = 18;
const MAX_AGE: i64 = 120;

/// Trim a free-text value; blank strings become `None` so that only NULL
/// ever means "unset" in storage.
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// GET /api/profile/{user_id}: public, no email.
pub async fn get_profile(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = with_db(&state, move |db| db.get_profile(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(profile))
}

/// PUT /api/profile: absent fields are kept, `null` or blank clears them.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let update = build_update(req)?;
    let user_id = claims.sub;

    let profile = with_db(&state, move |db| db.update_profile(user_id, &update)).await?;
    Ok(Json(profile))
}

fn build_update(req: UpdateProfileRequest) -> Result<ProfileUpdate, ApiError> {
    let age = req.age.map(parse_age).transpose()?;

    let sailing_level = req
        .sailing_level
        .map(|level| {
            normalize_text(level)
                .map(|l| l.to_lowercase().parse::<SailingLevel>())
                .transpose()
        })
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(ProfileUpdate {
        first_name: req.first_name.map(normalize_text),
        last_name: req.last_name.map(normalize_text),
        bio: req.bio.map(normalize_text),
        age,
        location: req.location.map(normalize_text),
        sailing_level,
        boat_type: req.boat_type.map(normalize_text),
    })
}

/// Blank text clears the age; anything else must be a whole number in range.
fn parse_age(value: Option<NumberOrText>) -> Result<Option<i64>, ApiError> {
    let age = match value {
        None => return Ok(None),
        Some(NumberOrText::Number(n)) => n,
        Some(NumberOrText::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .map_err(|_| ApiError::Validation(format!("Age must be a number, got {:?}", text)))?
        }
    };

    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(ApiError::Validation(format!(
            "Age must be between {} and {}",
            MIN_AGE, MAX_AGE
        )));
    }
    Ok(Some(age))
}

/// POST /api/profile/upload-photo: multipart field `photo`. Saves the image
/// under `{upload_dir}/photos/` and appends its public URL to the profile.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("photo") {
            continue;
        }
        let extension = match field.content_type() {
            Some("image/jpeg") => "jpg",
            Some("image/png") => "png",
            Some("image/webp") => "webp",
            other => {
                return Err(ApiError::Validation(format!(
                    "Invalid file type: {}",
                    other.unwrap_or("unknown")
                )));
            }
        };
        upload = Some((extension, field.bytes().await?));
        break;
    }

    let (extension, bytes) =
        upload.ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("No file uploaded".into()));
    }
    if bytes.len() > MAX_PHOTO_SIZE {
        return Err(ApiError::PayloadTooLarge("Photo exceeds 5 MB".into()));
    }

    let photo_dir = state.photo_dir();
    tokio::fs::create_dir_all(&photo_dir).await.map_err(|e| {
        error!("Failed to create photo directory {}: {}", photo_dir.display(), e);
        ApiError::internal(e)
    })?;

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path = photo_dir.join(&file_name);
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        ApiError::internal(e)
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        ApiError::internal(e)
    })?;
    file.flush().await.map_err(ApiError::internal)?;

    let photo_url = format!("/uploads/photos/{}", file_name);
    let user_id = claims.sub;
    let url = photo_url.clone();
    let photos = match with_db(&state, move |db| db.append_photo(user_id, &url)).await {
        Ok(photos) => photos,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&file_path).await {
                warn!("Failed to remove orphaned photo {}: {}", file_path.display(), rm);
            }
            return Err(e);
        }
    };

    info!("User {} uploaded photo {} ({} bytes)", user_id, file_name, bytes.len());
    Ok(Json(PhotoUploadResponse { photo_url, photos }))
}

/// GET /api/profile/discover/available?page=N
pub async fn discover(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(query), _): WithRejection<Query<PageQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_number(&query)?;
    let user_id = claims.sub;

    let profiles = with_db(&state, move |db| db.discover(user_id, page)).await?;
    Ok(Json(profiles))
}

pub(crate) fn page_number(query: &PageQuery) -> Result<u32, ApiError> {
    u32::try_from(query.page)
        .map_err(|_| ApiError::Validation("page must be a non-negative integer".into()))
}
