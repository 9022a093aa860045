//! SQLite persistence gateway.
//!
//! Role-based visibility is enforced here, at fetch time: principals only
//! ever receive their own rows, foundation actors receive the per-entity
//! visible status subset, admin receives everything. Status transitions are
//! the workflow module's job; this layer only reads and writes.

mod auth;
mod memos;
mod profiles;
mod rabs;
mod realizations;
mod reports;
mod schema;

pub use auth::*;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::realtime::ReportChange;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt stored value: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("username already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("permission denied")]
    Forbidden,
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    report_events: broadcast::Sender<ReportChange>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path())
    }

    /// In-memory database for tests.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn default_path() -> PathBuf {
        Self::resolve_path(std::env::var("SEKOLAH_ADMIN_DB").ok())
    }

    fn resolve_path(override_path: Option<String>) -> PathBuf {
        if let Some(path) = override_path {
            return PathBuf::from(path);
        }
        directories::ProjectDirs::from("id", "sekolah-admin", "sekolah-admin")
            .map(|dirs| dirs.data_dir().join("sekolah.sqlite"))
            .unwrap_or_else(|| PathBuf::from("sekolah.sqlite"))
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             PRAGMA foreign_keys=ON;\
             PRAGMA busy_timeout=5000;",
        )?;
        let (report_events, _) = broadcast::channel(64);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            report_events,
        })
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(schema::SCHEMA)?;
            Ok(())
        })
    }

    /// Row-change feed for the reports table, in commit order.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<ReportChange> {
        self.report_events.subscribe()
    }

    pub(crate) fn publish_report_change(&self, change: ReportChange) {
        // No subscribers is fine; the feed is best-effort.
        let _ = self.report_events.send(change);
    }

    /// The connection mutex is recoverable after a panic: SQLite state is
    /// consistent even if a holder unwound mid-call.
    pub(crate) fn with_conn<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError>,
    {
        let guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

pub(crate) fn get_uuid_str(s: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(s).map_err(|e| StoreError::Decode(format!("bad uuid {s:?}: {e}")))
}

/// Decode failure for a value already read out of a row.
pub(crate) fn decode_err(msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, msg.into())
}

pub(crate) fn get_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<uuid::Uuid> {
    let s: String = row.get(idx)?;
    uuid::Uuid::parse_str(&s).map_err(|e| decode_err(format!("bad uuid {s:?}: {e}")))
}

pub(crate) fn get_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn get_opt_datetime(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| decode_err(format!("bad timestamp {s:?}: {e}")))
    })
    .transpose()
}

pub(crate) fn get_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| decode_err(format!("bad date {s:?}: {e}")))
}

pub(crate) fn get_opt_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| decode_err(format!("bad date {s:?}: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.sqlite");
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn report_feed_delivers_in_order() {
        use crate::realtime::ChangeOp;

        let db = Database::open_memory().unwrap();
        let mut rx = db.subscribe_reports();
        let id = uuid::Uuid::new_v4();
        db.publish_report_change(ReportChange::new(ChangeOp::Insert, id));
        db.publish_report_change(ReportChange::new(ChangeOp::Delete, id));

        tokio_test::block_on(async {
            assert_eq!(rx.recv().await.unwrap().op, ChangeOp::Insert);
            assert_eq!(rx.recv().await.unwrap().op, ChangeOp::Delete);
        });
    }

    #[test]
    fn path_override_takes_precedence() {
        assert_eq!(
            Database::resolve_path(Some("/tmp/override.sqlite".into())),
            PathBuf::from("/tmp/override.sqlite")
        );
        assert!(Database::resolve_path(None).ends_with("sekolah.sqlite"));
    }
}
