//! Swipe ledger and match resolution.
//!
//! Both invariants live in the schema: `UNIQUE(user_id, target_user_id)` on
//! swipes and `UNIQUE(user_1_id, user_2_id)` on matches. The code here only
//! translates constraint outcomes; it takes no locks of its own beyond owning
//! the writer connection for the duration of one transaction.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use uuid::Uuid;

use sailmate_types::api::MatchSummary;
use sailmate_types::models::{Match, SwipeDirection, SwipeOutcome};

use crate::error::on_insert;
use crate::models::{MatchRow, MatchSummaryRow, now_timestamp};
use crate::{Database, DbError, Result};

/// Order an unordered pair so the lower identifier comes first.
///
/// `Uuid`'s ordering is byte order, which matches the lexical order of the
/// hyphenated lowercase text stored in the database.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Database {
    /// Record `actor`'s decision about `target` and resolve a match if the
    /// decision completes a mutual right swipe.
    ///
    /// Fails with `Validation` on a self-swipe, `NotFound` if either user is
    /// unknown and `Conflict` if `actor` already swiped on `target`.
    pub fn record_swipe(
        &self,
        actor: Uuid,
        target: Uuid,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome> {
        if actor == target {
            return Err(DbError::Validation("cannot swipe on yourself".into()));
        }

        let outcome = self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            tx.execute(
                "INSERT INTO swipes (id, user_id, target_user_id, direction, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    actor.to_string(),
                    target.to_string(),
                    direction.as_str(),
                    now_timestamp(),
                ],
            )
            .map_err(|e| on_insert(e, "already swiped on this user", "user"))?;

            // The mirror lookup only saves a wasted insert; insert_match is
            // what keeps the pair unique.
            let outcome = if direction == SwipeDirection::Right
                && has_right_swipe(&tx, target, actor)?
            {
                let m = insert_match(&tx, actor, target)?;
                SwipeOutcome::matched(m.id)
            } else {
                SwipeOutcome::no_match()
            };

            tx.commit()?;
            Ok(outcome)
        })?;

        debug!(
            "Swipe {} -> {} ({}): matched={}",
            actor, target, direction, outcome.matched
        );
        Ok(outcome)
    }

    /// Create the match for `{a, b}` or return the one that already exists.
    ///
    /// Does not check the swipe ledger; `record_swipe` is the only caller
    /// that decides a match is due.
    pub fn ensure_match(&self, a: Uuid, b: Uuid) -> Result<Match> {
        if a == b {
            return Err(DbError::Validation("a match needs two distinct users".into()));
        }
        self.with_conn_mut(|conn| insert_match(conn, a, b))
    }

    pub fn get_match(&self, match_id: Uuid) -> Result<Option<Match>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_1_id, user_2_id, created_at FROM matches WHERE id = ?1",
                [match_id.to_string()],
                MatchRow::from_row,
            )
            .optional()
            .map_err(DbError::from)
        })?
        .map(MatchRow::into_match)
        .transpose()
    }

    /// The match, only if `user_id` is one of its participants.
    pub fn get_match_for(&self, match_id: Uuid, user_id: Uuid) -> Result<Option<Match>> {
        Ok(self.get_match(match_id)?.filter(|m| m.involves(user_id)))
    }

    pub fn is_participant(&self, match_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self.get_match_for(match_id, user_id)?.is_some())
    }

    /// All of the user's matches, newest first, each described by the partner.
    pub fn list_matches(&self, user_id: Uuid) -> Result<Vec<MatchSummary>> {
        let id = user_id.to_string();
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id,
                        p.id,
                        p.username,
                        p.first_name,
                        p.photos,
                        m.created_at
                 FROM matches m
                 JOIN users p
                   ON p.id = CASE WHEN m.user_1_id = ?1 THEN m.user_2_id ELSE m.user_1_id END
                 WHERE m.user_1_id = ?1 OR m.user_2_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
            )?;
            let rows = stmt
                .query_map([&id], |row| {
                    Ok(MatchSummaryRow {
                        match_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        first_name: row.get(3)?,
                        photos: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(MatchSummaryRow::into_summary).collect()
    }
}

fn has_right_swipe(conn: &Connection, actor: Uuid, target: Uuid) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM swipes
             WHERE user_id = ?1 AND target_user_id = ?2 AND direction = 'right'
         )",
        params![actor.to_string(), target.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert-or-fetch on the canonical pair. The UNIQUE constraint decides who
/// wins when two requests get here for the same pair; the loser reads the
/// winner's row.
fn insert_match(conn: &Connection, a: Uuid, b: Uuid) -> Result<Match> {
    let (first, second) = canonical_pair(a, b);
    let (first, second) = (first.to_string(), second.to_string());

    let inserted = conn
        .execute(
            "INSERT INTO matches (id, user_1_id, user_2_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_1_id, user_2_id) DO NOTHING",
            params![Uuid::new_v4().to_string(), first, second, now_timestamp()],
        )
        .map_err(|e| on_insert(e, "match already exists", "user"))?;

    let row = conn.query_row(
        "SELECT id, user_1_id, user_2_id, created_at
         FROM matches
         WHERE user_1_id = ?1 AND user_2_id = ?2",
        params![first, second],
        MatchRow::from_row,
    )?;

    if inserted == 1 {
        info!("Match {} created for {} and {}", row.id, first, second);
    } else {
        debug!("Match {} already existed for {} and {}", row.id, first, second);
    }
    row.into_match()
}
