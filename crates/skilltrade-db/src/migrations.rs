use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_storage (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Single row: the last match list and the skill snapshot it was fetched for
        CREATE TABLE IF NOT EXISTS match_cache (
            id              INTEGER PRIMARY KEY CHECK (id = 1),
            skill_snapshot  TEXT NOT NULL,
            matches         TEXT NOT NULL,
            cached_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    debug!("Local storage migrations complete");
    Ok(())
}
