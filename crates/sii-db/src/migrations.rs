use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE help_requests (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                lat             REAL NOT NULL,
                lng             REAL NOT NULL,
                device_token    TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_help_requests_created
                ON help_requests(created_at);

            CREATE TABLE user_locations (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL UNIQUE,
                lat             REAL NOT NULL,
                lng             REAL NOT NULL,
                device_token    TEXT,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_user_locations_position
                ON user_locations(lat, lng);

            CREATE INDEX idx_user_locations_token
                ON user_locations(device_token);

            CREATE TABLE helper_offers (
                id                  TEXT PRIMARY KEY,
                helper_user_id      TEXT NOT NULL,
                lat                 REAL NOT NULL,
                lng                 REAL NOT NULL,
                device_token        TEXT,
                help_seeker_token   TEXT,
                positioned          INTEGER NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_helper_offers_seeker
                ON helper_offers(help_seeker_token, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (client fields)");
        conn.execute_batch(
            "
            ALTER TABLE help_requests ADD COLUMN extra TEXT;
            ALTER TABLE user_locations ADD COLUMN extra TEXT;

            INSERT INTO schema_version (version) VALUES (2);
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

        let (rows, latest): (i64, i64) = conn
            .query_row("SELECT COUNT(*), MAX(version) FROM schema_version", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((rows, latest), (2, 2));
    }
}
