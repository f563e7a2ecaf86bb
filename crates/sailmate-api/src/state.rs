use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use sailmate_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Root of the public upload tree; photos live in `{upload_dir}/photos`.
    pub upload_dir: PathBuf,
    pub token_ttl: chrono::Duration,
}

impl AppStateInner {
    pub fn photo_dir(&self) -> PathBuf {
        self.upload_dir.join("photos")
    }
}

/// Run a blocking database call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> sailmate_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(e)
        })?
        .map_err(ApiError::from)
}
