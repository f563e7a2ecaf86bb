use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                first_name      TEXT,
                last_name       TEXT,
                bio             TEXT,
                age             INTEGER,
                location        TEXT,
                sailing_level   TEXT,
                boat_type       TEXT,
                photos          TEXT NOT NULL DEFAULT '[]',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE swipes (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                direction       TEXT NOT NULL CHECK (direction IN ('left', 'right')),
                created_at      TEXT NOT NULL,
                CHECK (user_id <> target_user_id),
                UNIQUE (user_id, target_user_id)
            );

            CREATE INDEX idx_swipes_target_user_id ON swipes(target_user_id);

            -- user_1_id < user_2_id makes the unordered pair unique
            CREATE TABLE matches (
                id              TEXT PRIMARY KEY,
                user_1_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user_2_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                CHECK (user_1_id < user_2_id),
                UNIQUE (user_1_id, user_2_id)
            );

            CREATE INDEX idx_matches_user_2_id ON matches(user_2_id);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                match_id        TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_match_created ON messages(match_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
