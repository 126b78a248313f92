//! SQLite-backed record store.
//!
//! Provides persistent storage for:
//! - Users with their stitch and caterpillar counters
//! - Flowers, one row per grant, ordered by grant
//!
//! The connection sits behind a mutex, so every [`RecordStore`] call runs
//! as a single atomic unit against the database.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::store::{ExportTable, LeaderboardRow, RecordStore, ResetSummary, UserId, UserRecord};
use crate::error::StorageError;

/// SQLite database holding the garden.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path`.
    ///
    /// File databases run in WAL mode with a 5 second busy timeout so a
    /// contended write fails instead of hanging.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::QueryFailed(format!("{}: {e}", parent.display())))?;
            }
        }

        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        debug!(path = %path.display(), "garden database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock()?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                seq          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      INTEGER NOT NULL UNIQUE,
                name         TEXT NOT NULL,
                stitches     INTEGER NOT NULL DEFAULT 0,
                caterpillars INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flowers (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                flower     TEXT NOT NULL,
                granted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_stitches ON users(stitches DESC, seq ASC);
            CREATE INDEX IF NOT EXISTS idx_flowers_user ON flowers(user_id, id);",
        )?;
        Ok(())
    }

    fn flowers_of(conn: &Connection, user_id: UserId) -> Result<Vec<String>, rusqlite::Error> {
        let mut stmt = conn.prepare_cached("SELECT flower FROM flowers WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        rows.collect()
    }
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn render(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}

impl RecordStore for Database {
    fn ensure_user(&self, user_id: UserId, display_name: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (user_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, display_name, Utc::now().to_rfc3339()],
        )?;
        if inserted > 0 {
            info!(user_id, name = display_name, "new gardener registered");
        }
        Ok(())
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let conn = self.conn.lock()?;
        let user = conn
            .query_row(
                "SELECT name, stitches, caterpillars FROM users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserRecord {
                        user_id,
                        display_name: row.get(0)?,
                        stitch_count: count(row.get(1)?),
                        caterpillar_count: count(row.get(2)?),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn adjust_stitches(&self, user_id: UserId, delta: i64) -> Result<u64, StorageError> {
        let conn = self.conn.lock()?;
        let stitches: Option<i64> = conn
            .query_row(
                "UPDATE users SET stitches = MAX(stitches + ?1, 0) WHERE user_id = ?2 RETURNING stitches",
                params![delta, user_id],
                |row| row.get(0),
            )
            .optional()?;
        stitches
            .map(count)
            .ok_or(StorageError::UnknownUser(user_id))
    }

    fn increment_caterpillars(&self, user_id: UserId) -> Result<u64, StorageError> {
        let conn = self.conn.lock()?;
        let caterpillars: Option<i64> = conn
            .query_row(
                "UPDATE users SET caterpillars = caterpillars + 1 WHERE user_id = ?1 RETURNING caterpillars",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        caterpillars
            .map(count)
            .ok_or(StorageError::UnknownUser(user_id))
    }

    fn append_flower(&self, user_id: UserId, flower: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT INTO flowers (user_id, flower, granted_at)
             SELECT user_id, ?2, ?3 FROM users WHERE user_id = ?1",
            params![user_id, flower, Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            return Err(StorageError::UnknownUser(user_id));
        }
        Ok(())
    }

    fn list_flowers(&self, user_id: UserId) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock()?;
        Ok(Self::flowers_of(&conn, user_id)?)
    }

    fn top_users(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StorageError> {
        let conn = self.conn.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(
            "SELECT user_id, name, stitches FROM users
             ORDER BY stitches DESC, seq ASC
             LIMIT ?1",
        )?;
        let leaders = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(leaders.len());
        for (user_id, display_name, stitches) in leaders {
            rows.push(LeaderboardRow {
                display_name,
                stitch_count: count(stitches),
                bouquet: Self::flowers_of(&conn, user_id)?.join(" "),
            });
        }
        Ok(rows)
    }

    fn all_users(&self) -> Result<Vec<(UserRecord, Vec<String>)>, StorageError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, name, stitches, caterpillars FROM users ORDER BY seq ASC",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    stitch_count: count(row.get(2)?),
                    caterpillar_count: count(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let flowers = Self::flowers_of(&conn, user.user_id)?;
            out.push((user, flowers));
        }
        Ok(out)
    }

    fn all_users_with_headers(&self) -> Result<ExportTable, StorageError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY seq ASC")?;
        let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = headers.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i).map(render))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExportTable { headers, rows })
    }

    fn reset_all(&self) -> Result<ResetSummary, StorageError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let deleted_flowers = tx.execute("DELETE FROM flowers", [])?;
        let deleted_users = tx.execute("DELETE FROM users", [])?;
        tx.commit()?;
        Ok(ResetSummary {
            deleted_users,
            deleted_flowers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(db: &Database, users: &[(UserId, &str, i64)]) {
        for (id, name, stitches) in users {
            db.ensure_user(*id, name).unwrap();
            db.adjust_stitches(*id, *stitches).unwrap();
        }
    }

    #[test]
    fn ensure_user_is_insert_if_absent() {
        let db = Database::open_memory().unwrap();
        db.ensure_user(1, "Anna").unwrap();
        db.adjust_stitches(1, 40).unwrap();
        db.ensure_user(1, "Renamed").unwrap();

        let user = db.get_user(1).unwrap().unwrap();
        assert_eq!(user.display_name, "Anna");
        assert_eq!(user.stitch_count, 40);
        assert_eq!(user.caterpillar_count, 0);
    }

    #[test]
    fn missing_user_is_absent() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_user(99).unwrap().is_none());
    }

    #[test]
    fn adjust_stitches_floors_at_zero() {
        let db = Database::open_memory().unwrap();
        db.ensure_user(1, "Anna").unwrap();
        assert_eq!(db.adjust_stitches(1, 60).unwrap(), 60);
        assert_eq!(db.adjust_stitches(1, -100).unwrap(), 0);
        assert_eq!(db.adjust_stitches(1, 5).unwrap(), 5);
    }

    #[test]
    fn adjust_unknown_user_fails() {
        let db = Database::open_memory().unwrap();
        let err = db.adjust_stitches(7, 10).unwrap_err();
        assert!(matches!(err, StorageError::UnknownUser(7)));
    }

    #[test]
    fn caterpillars_count_up() {
        let db = Database::open_memory().unwrap();
        db.ensure_user(1, "Anna").unwrap();
        assert_eq!(db.increment_caterpillars(1).unwrap(), 1);
        assert_eq!(db.increment_caterpillars(1).unwrap(), 2);
        assert_eq!(db.get_user(1).unwrap().unwrap().caterpillar_count, 2);
    }

    #[test]
    fn flowers_keep_grant_order() {
        let db = Database::open_memory().unwrap();
        db.ensure_user(1, "Anna").unwrap();
        for flower in ["🌷", "🌻", "🌷"] {
            db.append_flower(1, flower).unwrap();
        }
        assert_eq!(db.list_flowers(1).unwrap(), vec!["🌷", "🌻", "🌷"]);
    }

    #[test]
    fn append_flower_requires_user() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.append_flower(3, "🌷").unwrap_err(),
            StorageError::UnknownUser(3)
        ));
    }

    #[test]
    fn top_users_is_stable_on_ties() {
        let db = Database::open_memory().unwrap();
        seeded(
            &db,
            &[(10, "fifty", 50), (20, "first200", 200), (30, "second200", 200), (40, "ten", 10)],
        );
        db.append_flower(30, "🌸").unwrap();

        let top = db.top_users(3).unwrap();
        let names: Vec<_> = top.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["first200", "second200", "fifty"]);
        assert_eq!(top[1].bouquet, "🌸");
        assert_eq!(top[0].bouquet, "");
    }

    #[test]
    fn reset_all_wipes_everything() {
        let db = Database::open_memory().unwrap();
        seeded(&db, &[(1, "Anna", 700), (2, "Boris", 20)]);
        db.append_flower(1, "🌹").unwrap();

        let summary = db.reset_all().unwrap();
        assert_eq!(summary.deleted_users, 2);
        assert_eq!(summary.deleted_flowers, 1);
        assert!(db.get_user(1).unwrap().is_none());
        assert!(db.list_flowers(1).unwrap().is_empty());
        assert!(db.top_users(10).unwrap().is_empty());
    }

    #[test]
    fn raw_dump_carries_column_names() {
        let db = Database::open_memory().unwrap();
        seeded(&db, &[(5, "Vera", 12)]);

        let table = db.all_users_with_headers().unwrap();
        assert_eq!(
            table.headers,
            vec!["seq", "user_id", "name", "stitches", "caterpillars", "created_at"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "5");
        assert_eq!(table.rows[0][2], "Vera");
        assert_eq!(table.rows[0][3], "12");
    }

    #[test]
    fn all_users_in_insertion_order() {
        let db = Database::open_memory().unwrap();
        seeded(&db, &[(9, "late", 900), (3, "early", 1)]);
        db.append_flower(9, "🪷").unwrap();

        let users = db.all_users().unwrap();
        assert_eq!(users[0].0.user_id, 9);
        assert_eq!(users[0].1, vec!["🪷"]);
        assert_eq!(users[1].0.user_id, 3);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("garden.db");
        {
            let db = Database::open_at(&path).unwrap();
            seeded(&db, &[(1, "Anna", 30)]);
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_user(1).unwrap().unwrap().stitch_count, 30);
    }
}
