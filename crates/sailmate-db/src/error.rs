use rusqlite::ffi;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// A stored value could not be decoded (bad uuid, timestamp, photo list).
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

pub(crate) fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Some(ConstraintKind::Unique)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintKind::ForeignKey),
            ffi::SQLITE_CONSTRAINT_CHECK => Some(ConstraintKind::Check),
            _ => None,
        },
        _ => None,
    }
}

/// Translate constraint violations on an insert into domain errors.
/// Anything else stays a storage error.
pub(crate) fn on_insert(err: rusqlite::Error, conflict: &str, missing: &str) -> DbError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Unique) => DbError::Conflict(conflict.to_string()),
        Some(ConstraintKind::ForeignKey) => DbError::NotFound(missing.to_string()),
        Some(ConstraintKind::Check) => DbError::Validation(err.to_string()),
        None => DbError::Sqlite(err),
    }
}
