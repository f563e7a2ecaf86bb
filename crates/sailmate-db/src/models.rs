//! Database row types. These map directly to SQLite rows and are converted
//! into `sailmate-types` models at the edge of the query layer.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use sailmate_types::api::MatchSummary;
use sailmate_types::models::{Account, Match, Message, SailingLevel, UserProfile};

use crate::{DbError, Result};

/// Fixed-width UTC text, so lexical order equals time order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through the sqlite shell use datetime('now').
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| DbError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

pub fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| DbError::Corrupt(format!("uuid '{}': {}", raw, e)))
}

pub(crate) fn parse_photos_json(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| DbError::Corrupt(format!("photos '{}': {}", raw, e)))
}

/// Input for account creation. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial profile update: `None` keeps the stored value, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub age: Option<Option<i64>>,
    pub location: Option<Option<String>>,
    pub sailing_level: Option<Option<SailingLevel>>,
    pub boat_type: Option<Option<String>>,
}

pub(crate) const USER_COLUMNS: &str = "id, email, username, password, first_name, last_name, bio, age, \
     location, sailing_level, boat_type, photos, created_at, updated_at";

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub age: Option<i64>,
    pub location: Option<String>,
    pub sailing_level: Option<String>,
    pub boat_type: Option<String>,
    pub photos: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    /// Expects the columns in `USER_COLUMNS` order.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            bio: row.get(6)?,
            age: row.get(7)?,
            location: row.get(8)?,
            sailing_level: row.get(9)?,
            boat_type: row.get(10)?,
            photos: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    pub fn user_id(&self) -> Result<Uuid> {
        parse_uuid(&self.id)
    }

    pub fn into_profile(self) -> Result<UserProfile> {
        let sailing_level = self
            .sailing_level
            .as_deref()
            .map(str::parse::<SailingLevel>)
            .transpose()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;

        Ok(UserProfile {
            id: parse_uuid(&self.id)?,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            age: self.age,
            location: self.location,
            sailing_level,
            boat_type: self.boat_type,
            photos: parse_photos_json(&self.photos)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }

    pub fn into_account(self) -> Result<Account> {
        let email = self.email.clone();
        Ok(Account {
            email,
            profile: self.into_profile()?,
        })
    }
}

pub struct MatchRow {
    pub id: String,
    pub user_1_id: String,
    pub user_2_id: String,
    pub created_at: String,
}

impl MatchRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_1_id: row.get(1)?,
            user_2_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn into_match(self) -> Result<Match> {
        Ok(Match {
            id: parse_uuid(&self.id)?,
            user1_id: parse_uuid(&self.user_1_id)?,
            user2_id: parse_uuid(&self.user_2_id)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// A match joined with the partner's public details.
pub struct MatchSummaryRow {
    pub match_id: String,
    pub user_id: String,
    pub username: String,
    pub first_name: Option<String>,
    pub photos: String,
    pub created_at: String,
}

impl MatchSummaryRow {
    pub fn into_summary(self) -> Result<MatchSummary> {
        Ok(MatchSummary {
            match_id: parse_uuid(&self.match_id)?,
            user_id: parse_uuid(&self.user_id)?,
            username: self.username,
            first_name: self.first_name,
            photos: parse_photos_json(&self.photos)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct MessageRow {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_uuid(&self.id)?,
            match_id: parse_uuid(&self.match_id)?,
            sender_id: parse_uuid(&self.sender_id)?,
            content: self.content,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
