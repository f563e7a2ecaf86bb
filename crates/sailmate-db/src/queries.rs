use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use sailmate_types::models::{Account, Message, SwipeStats, UserProfile};

use crate::error::on_insert;
use crate::models::{
    MessageRow, NewUser, ProfileUpdate, USER_COLUMNS, UserRow, now_timestamp, parse_photos_json,
};
use crate::{Database, DbError, Result};

pub const DISCOVER_PAGE_SIZE: u32 = 10;
pub const MESSAGE_PAGE_SIZE: u32 = 50;

impl Database {
    // -- Users --

    /// Fails with `Conflict` when the email or username is taken.
    pub fn create_user(&self, user: &NewUser) -> Result<()> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, password, first_name, last_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.username,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    now,
                ],
            )
            .map_err(|e| on_insert(e, "email or username already exists", "user"))?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_account(&self, user_id: Uuid) -> Result<Option<Account>> {
        self.with_conn(|conn| query_user(conn, "id", &user_id.to_string()))?
            .map(UserRow::into_account)
            .transpose()
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        self.with_conn(|conn| query_user(conn, "id", &user_id.to_string()))?
            .map(UserRow::into_profile)
            .transpose()
    }

    /// Apply a partial update and return the resulting profile.
    pub fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<UserProfile> {
        let id = user_id.to_string();
        let now = now_timestamp();
        let sailing_level = update
            .sailing_level
            .map(|level| level.map(|l| l.as_str()));

        let row = self.with_conn_mut(|conn| {
            // For each column: ?n says whether to write, ?n+1 is the new value.
            let changed = conn.execute(
                "UPDATE users SET
                    first_name    = CASE WHEN ?2  THEN ?3  ELSE first_name END,
                    last_name     = CASE WHEN ?4  THEN ?5  ELSE last_name END,
                    bio           = CASE WHEN ?6  THEN ?7  ELSE bio END,
                    age           = CASE WHEN ?8  THEN ?9  ELSE age END,
                    location      = CASE WHEN ?10 THEN ?11 ELSE location END,
                    sailing_level = CASE WHEN ?12 THEN ?13 ELSE sailing_level END,
                    boat_type     = CASE WHEN ?14 THEN ?15 ELSE boat_type END,
                    updated_at    = ?16
                 WHERE id = ?1",
                params![
                    id,
                    update.first_name.is_some(),
                    update.first_name.clone().flatten(),
                    update.last_name.is_some(),
                    update.last_name.clone().flatten(),
                    update.bio.is_some(),
                    update.bio.clone().flatten(),
                    update.age.is_some(),
                    update.age.flatten(),
                    update.location.is_some(),
                    update.location.clone().flatten(),
                    sailing_level.is_some(),
                    sailing_level.flatten(),
                    update.boat_type.is_some(),
                    update.boat_type.clone().flatten(),
                    now,
                ],
            )?;

            if changed == 0 {
                return Err(DbError::NotFound(format!("user {}", id)));
            }
            query_user(conn, "id", &id)?.ok_or_else(|| DbError::NotFound(format!("user {}", id)))
        })?;

        debug!("Profile {} updated", user_id);
        row.into_profile()
    }

    /// Append a photo URL to the user's ordered photo list in one statement.
    /// Returns the full list after the append.
    pub fn append_photo(&self, user_id: Uuid, url: &str) -> Result<Vec<String>> {
        let id = user_id.to_string();
        let now = now_timestamp();
        let photos: Option<String> = self.with_conn_mut(|conn| {
            let photos = conn
                .query_row(
                    "UPDATE users SET photos = json_insert(photos, '$[#]', ?2), updated_at = ?3
                     WHERE id = ?1
                     RETURNING photos",
                    params![id, url, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(photos)
        })?;

        let photos = photos.ok_or_else(|| DbError::NotFound(format!("user {}", id)))?;
        parse_photos_json(&photos)
    }

    /// Profiles the user has not swiped on yet, newest accounts first.
    pub fn discover(&self, user_id: Uuid, page: u32) -> Result<Vec<UserProfile>> {
        let id = user_id.to_string();
        let offset = i64::from(page) * i64::from(DISCOVER_PAGE_SIZE);

        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS}
                 FROM users
                 WHERE id != ?1
                   AND id NOT IN (SELECT target_user_id FROM swipes WHERE user_id = ?1)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![id, DISCOVER_PAGE_SIZE, offset], UserRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(UserRow::into_profile).collect()
    }

    // -- Swipe stats --

    pub fn swipe_stats(&self, user_id: Uuid) -> Result<SwipeStats> {
        let id = user_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT direction, COUNT(*) FROM swipes WHERE user_id = ?1 GROUP BY direction",
            )?;
            let counts = stmt
                .query_map([&id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stats = SwipeStats::default();
            for (direction, count) in counts {
                match direction.as_str() {
                    "right" => stats.right = count,
                    "left" => stats.left = count,
                    other => return Err(DbError::Corrupt(format!("swipe direction '{}'", other))),
                }
            }
            Ok(stats)
        })
    }

    // -- Messages --

    /// The caller must have checked that `sender_id` is part of the match.
    pub fn append_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let row = MessageRow {
            id: Uuid::new_v4().to_string(),
            match_id: match_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: now_timestamp(),
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, match_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.match_id, row.sender_id, row.content, row.created_at],
            )
            .map_err(|e| on_insert(e, "duplicate message id", "match or sender"))?;
            Ok(())
        })?;

        row.into_message()
    }

    /// One page of a match's history. Page 0 holds the newest
    /// `MESSAGE_PAGE_SIZE` messages; each page is returned oldest first.
    pub fn list_messages(&self, match_id: Uuid, page: u32) -> Result<Vec<Message>> {
        let id = match_id.to_string();
        let offset = i64::from(page) * i64::from(MESSAGE_PAGE_SIZE);

        let mut rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, match_id, sender_id, content, created_at
                 FROM messages
                 WHERE match_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![id, MESSAGE_PAGE_SIZE, offset], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        match_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.reverse();
        rows.into_iter().map(MessageRow::into_message).collect()
    }
}

fn query_user(conn: &Connection, column: &'static str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], UserRow::from_row).optional()?;
    Ok(row)
}
