//! sqlite-store — SQLite implementation of the LinkStore port for local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based store to run the system locally
//!   without cloud dependencies.
//! - Implements the `LinkStore` trait from the `domain` crate using the
//!   simple physical layout: `code` is the table primary key, so
//!   `PutMode::IfAbsent` rides on the primary-key constraint and is atomic.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Stores timestamps as seconds since UNIX_EPOCH (u64).

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{Code, CoreError, Link, LinkStore, PutMode};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed link store for local development.
pub struct SqliteStore {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    /// Construct from env var `DB_PATH` (defaults to `./data/links.db`).
    pub fn from_env() -> Result<Self, CoreError> {
        let path = std::env::var("DB_PATH").unwrap_or_else(|_| "./data/links.db".to_string());
        // Ensure directory exists
        if let Some(dir) = std::path::Path::new(&path).parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        Self::new(path)
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            code TEXT PRIMARY KEY,
            long_url TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            owner_execution_id TEXT
        );
        "#,
    )
    .map_err(map_sqerr)?;
    Ok(())
}

impl LinkStore for SqliteStore {
    fn put(&self, link: Link, mode: PutMode) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        let sql = match mode {
            PutMode::IfAbsent => {
                "INSERT INTO links(code, long_url, created_at, owner_execution_id) \
                 VALUES (?1, ?2, ?3, ?4)"
            }
            PutMode::Overwrite => {
                "INSERT OR REPLACE INTO links(code, long_url, created_at, owner_execution_id) \
                 VALUES (?1, ?2, ?3, ?4)"
            }
        };
        conn.execute(
            sql,
            params![
                link.code.as_str(),
                link.long_url,
                system_time_to_secs(link.created_at) as i64,
                link.owner_execution_id,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CoreError::AlreadyExists
            }
            other => map_sqerr(other),
        })?;
        Ok(())
    }

    fn get_by_code(&self, code: &Code) -> Result<Option<Link>, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        let row = conn
            .query_row(
                "SELECT code, long_url, created_at, owner_execution_id \
                 FROM links WHERE code = ?1",
                params![code.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(map_sqerr)?;

        match row {
            Some((code_str, long_url, created_at, owner)) => {
                let code = Code::new(code_str)
                    .map_err(|e| CoreError::Storage(format!("bad stored code: {e}")))?;
                let mut link = Link::new(code, long_url, secs_to_system_time(created_at as u64));
                link.owner_execution_id = owner;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }
}

fn map_sqerr(e: rusqlite::Error) -> CoreError {
    CoreError::Storage(format!("sqlite: {e}"))
}

fn system_time_to_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn secs_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::new(dir.path().join("links.db")).expect("open");
        (dir, store)
    }

    fn link(code: &str, url: &str) -> Link {
        Link::new(
            Code::new(code).unwrap(),
            url.to_string(),
            secs_to_system_time(1_700_000_000),
        )
    }

    #[test]
    fn put_and_get_round_trip() {
        let (_dir, store) = store();
        store
            .put(link("abc123", "https://example.com"), PutMode::IfAbsent)
            .unwrap();
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://example.com");
        assert_eq!(system_time_to_secs(got.created_at), 1_700_000_000);
        assert!(got.owner_execution_id.is_none());
    }

    #[test]
    fn if_absent_is_guarded_by_primary_key() {
        let (_dir, store) = store();
        store
            .put(link("abc123", "https://one.example"), PutMode::IfAbsent)
            .unwrap();
        let err = store
            .put(link("abc123", "https://two.example"), PutMode::IfAbsent)
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists));
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://one.example");
    }

    #[test]
    fn overwrite_replaces_existing_row() {
        let (_dir, store) = store();
        store
            .put(link("abc123", "https://one.example"), PutMode::IfAbsent)
            .unwrap();
        store
            .put(link("abc123", "https://two.example"), PutMode::Overwrite)
            .unwrap();
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.long_url, "https://two.example");
    }

    #[test]
    fn get_missing_is_none() {
        let (_dir, store) = store();
        assert!(store
            .get_by_code(&Code::new("nothere").unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn owner_execution_id_round_trips() {
        let (_dir, store) = store();
        let mut l = link("abc123", "https://example.com");
        l.owner_execution_id = Some("exec-42".into());
        store.put(l, PutMode::IfAbsent).unwrap();
        let got = store
            .get_by_code(&Code::new("abc123").unwrap())
            .unwrap()
            .expect("present");
        assert_eq!(got.owner_execution_id.as_deref(), Some("exec-42"));
    }
}
