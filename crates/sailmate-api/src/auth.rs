use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use sailmate_db::NewUser;
use sailmate_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::middleware::create_token;
use crate::profile::normalize_text;
use crate::state::{AppState, with_db};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    if email.is_empty() || username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email, password, and username required".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Email address is invalid".into()));
    }
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Err(ApiError::Validation("Username must be 3 to 32 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters".into()));
    }

    // Hashing is CPU bound; keep it off the async workers.
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    let user = NewUser {
        id: Uuid::new_v4(),
        email,
        username,
        password_hash,
        first_name: normalize_text(req.first_name),
        last_name: normalize_text(req.last_name),
    };
    let row = user.clone();
    with_db(&state, move |db| db.create_user(&row)).await?;

    let token = create_token(
        &state.jwt_secret,
        state.token_ttl,
        user.id,
        &user.email,
        &user.username,
    )
    .map_err(ApiError::internal)?;

    info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".into()));
    }

    let password = req.password;
    let lookup = email.clone();
    let user = with_db(&state, move |db| {
        let Some(user) = db.get_user_by_email(&lookup)? else {
            return Ok(None);
        };
        Ok(verify_password(&password, &user.password).then_some(user))
    })
    .await?;

    let Some(user) = user else {
        warn!("Failed login for {}", email);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let user_id = user.user_id()?;
    let token = create_token(
        &state.jwt_secret,
        state.token_ttl,
        user_id,
        &user.email,
        &user.username,
    )
    .map_err(ApiError::internal)?;

    Ok(Json(AuthResponse {
        token,
        user_id,
        username: user.username,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let account = with_db(&state, move |db| db.get_account(user_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(account))
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// A stored hash that fails to parse counts as a mismatch.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unparseable password hash in users table: {}", e);
            false
        }
    }
}
