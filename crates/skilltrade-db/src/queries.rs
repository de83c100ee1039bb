use crate::Database;
use crate::models::MatchCacheRow;
use anyhow::Result;
use rusqlite::Connection;

const TOKEN_KEY: &str = "token";

impl Database {
    // -- Key/value --

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| query_item(conn, key))
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                (key, value),
            )?;
            Ok(())
        })
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM local_storage WHERE key = ?1", [key])?;
            Ok(())
        })
    }

    // -- Credential --

    pub fn token(&self) -> Result<Option<String>> {
        self.get_item(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.set_item(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<()> {
        self.remove_item(TOKEN_KEY)
    }

    // -- Match cache --

    pub fn match_cache(&self) -> Result<Option<MatchCacheRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT skill_snapshot, matches, cached_at FROM match_cache WHERE id = 1",
                    [],
                    |row| {
                        Ok(MatchCacheRow {
                            skill_snapshot: row.get(0)?,
                            matches: row.get(1)?,
                            cached_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn put_match_cache(&self, skill_snapshot: &str, matches: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO match_cache (id, skill_snapshot, matches) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     skill_snapshot = excluded.skill_snapshot,
                     matches = excluded.matches,
                     cached_at = datetime('now')",
                (skill_snapshot, matches),
            )?;
            Ok(())
        })
    }

    pub fn clear_match_cache(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM match_cache", [])?;
            Ok(())
        })
    }

    /// Drops everything tied to the signed-in user.
    pub fn clear_session(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM local_storage; DELETE FROM match_cache;")?;
            Ok(())
        })
    }
}

fn query_item(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM local_storage WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
