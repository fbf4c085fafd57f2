//! Audit recorder — append-only event log with newest-first read-back.
//!
//! Events are appended with a server-generated timestamp inside a SQLite
//! transaction, so an append is atomic and flushed before `record` returns:
//! concurrent callers cannot interleave partial rows, and a crash immediately
//! after a record call does not lose the entry. The recorder exclusively owns
//! event persistence; events are never mutated after creation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};

use crate::error::AppError;
use crate::policy::Role;

const DB_FILENAME: &str = "audit.db";

/// What the actor did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Upload,
    Search,
    ResetDb,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "Upload",
            AuditAction::Search => "Search",
            AuditAction::ResetDb => "Reset DB",
        }
    }
}

/// How the action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Allowed,
    DeniedSecurity,
    NoData,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "Success",
            AuditOutcome::Allowed => "Allowed",
            AuditOutcome::DeniedSecurity => "DENIED_SECURITY",
            AuditOutcome::NoData => "No Data",
            AuditOutcome::Failure => "Failure",
        }
    }
}

/// One immutable log entry, as read back from the table.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub timestamp: String,
    pub actor: String,
    pub role: String,
    pub action: String,
    /// Query text or file name — never retrieved chunk content.
    pub detail: String,
    pub outcome: String,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    db_path: PathBuf,
}

impl AuditLog {
    /// Open (creating if needed) the event log under `dir`.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Storage(format!("audit: cannot create {}: {e}", dir.display())))?;
        let log = Self {
            db_path: dir.join(DB_FILENAME),
        };
        log.init_db()?;
        Ok(log)
    }

    /// Append one event with a server-generated timestamp.
    pub fn record(
        &self,
        actor: &str,
        role: Role,
        action: AuditAction,
        detail: &str,
        outcome: AuditOutcome,
    ) -> Result<(), AppError> {
        self.record_at(&now_iso8601(), actor, role.label(), action, detail, outcome)
    }

    fn record_at(
        &self,
        timestamp: &str,
        actor: &str,
        role: &str,
        action: AuditAction,
        detail: &str,
        outcome: AuditOutcome,
    ) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, actor, role, action, detail, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![timestamp, actor, role, action.as_str(), detail, outcome.as_str()],
        )
        .map_err(|e| AppError::Storage(format!("audit: insert event: {e}")))?;
        Ok(())
    }

    /// All events, newest first. Ties on timestamp keep insertion order, the
    /// behavior of a stable descending sort over the append sequence.
    /// Returns an empty Vec when nothing has been recorded.
    pub fn list(&self) -> Result<Vec<AuditEvent>, AppError> {
        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, actor, role, action, detail, status \
                 FROM audit_events ORDER BY timestamp DESC, seq ASC",
            )
            .map_err(|e| AppError::Storage(format!("audit: prepare list: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(AuditEvent {
                    timestamp: row.get(0)?,
                    actor: row.get(1)?,
                    role: row.get(2)?,
                    action: row.get(3)?,
                    detail: row.get(4)?,
                    outcome: row.get(5)?,
                })
            })
            .map_err(|e| AppError::Storage(format!("audit: execute list: {e}")))?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|e| AppError::Storage(format!("audit: map list row: {e}")))?);
        }
        Ok(events)
    }

    /// Number of recorded events.
    pub fn count(&self) -> Result<usize, AppError> {
        let conn = self.open_conn()?;
        let n: i64 = conn
            .query_row("SELECT count(*) FROM audit_events", [], |row| row.get(0))
            .map_err(|e| AppError::Storage(format!("audit: count: {e}")))?;
        Ok(n as usize)
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS audit_events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                actor TEXT NOT NULL,
                role TEXT NOT NULL,
                action TEXT NOT NULL,
                detail TEXT NOT NULL,
                status TEXT NOT NULL
            );
            ",
        )
        .map_err(|e| AppError::Storage(format!("audit: initialize schema: {e}")))?;
        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Storage(format!("audit: open {}: {e}", self.db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Storage(format!("audit: set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Storage(format!("audit: set busy_timeout: {e}")))?;

        Ok(conn)
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_log() -> (TempDir, AuditLog) {
        let temp = TempDir::new().expect("tempdir");
        let log = AuditLog::open(&temp.path().join("audit")).expect("open audit log");
        (temp, log)
    }

    #[test]
    fn empty_log_lists_nothing() {
        let (_t, log) = make_log();
        assert!(log.list().expect("list").is_empty());
        assert_eq!(log.count().expect("count"), 0);
    }

    #[test]
    fn record_and_read_back() {
        let (_t, log) = make_log();
        log.record("alice", Role::Junior, AuditAction::Search, "merger details", AuditOutcome::DeniedSecurity)
            .expect("record");

        let events = log.list().expect("list");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "alice");
        assert_eq!(events[0].role, "Junior Auditor");
        assert_eq!(events[0].action, "Search");
        assert_eq!(events[0].detail, "merger details");
        assert_eq!(events[0].outcome, "DENIED_SECURITY");
        assert!(!events[0].timestamp.is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let (_t, log) = make_log();
        log.record_at("2026-08-06T10:00:00.000Z", "a", "Admin", AuditAction::Upload, "one.txt", AuditOutcome::Success)
            .expect("record");
        log.record_at("2026-08-06T10:00:02.000Z", "b", "Admin", AuditAction::Search, "q2", AuditOutcome::Allowed)
            .expect("record");
        log.record_at("2026-08-06T10:00:01.000Z", "c", "Admin", AuditAction::Search, "q3", AuditOutcome::NoData)
            .expect("record");

        let events = log.list().expect("list");
        let details: Vec<&str> = events.iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(details, vec!["q2", "q3", "one.txt"]);
        for pair in events.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn timestamp_ties_keep_insertion_order() {
        let (_t, log) = make_log();
        let ts = "2026-08-06T12:30:00.000Z";
        for detail in ["first", "second", "third"] {
            log.record_at(ts, "x", "Manager", AuditAction::Search, detail, AuditOutcome::Allowed)
                .expect("record");
        }

        let events = log.list().expect("list");
        let details: Vec<&str> = events.iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(details, vec!["first", "second", "third"]);
    }

    #[test]
    fn outcome_wire_strings() {
        assert_eq!(AuditOutcome::DeniedSecurity.as_str(), "DENIED_SECURITY");
        assert_eq!(AuditOutcome::NoData.as_str(), "No Data");
        assert_eq!(AuditAction::ResetDb.as_str(), "Reset DB");
    }
}
