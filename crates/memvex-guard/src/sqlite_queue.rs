// sqlite_queue.rs — Persisted approval queue on an embedded SQLite file.
//
// Schema (column names are part of the on-disk contract):
//
//   approval_requests(id TEXT PK, action, agent, params JSON-text, reason,
//                     status, created_at, decided_at)
//
// Timestamps are ISO-8601 text with millisecond precision. The file runs in
// WAL mode so completed writes survive a restart and several processes can
// open the same file. Decisions are a single
// `UPDATE … WHERE status = 'pending' RETURNING *`, which makes the
// check-and-set atomic inside SQLite itself, across handles and processes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::approval::{ApprovalBackend, ApprovalRequest, ApprovalStatus};
use crate::error::GuardError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS approval_requests (
        id TEXT PRIMARY KEY,
        action TEXT NOT NULL,
        agent TEXT,
        params TEXT,
        reason TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        decided_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_approvals_status ON approval_requests(status);
    CREATE INDEX IF NOT EXISTS idx_approvals_date ON approval_requests(created_at);
";

const COLUMNS: &str = "id, action, agent, params, reason, status, created_at, decided_at";

/// How long a handle waits for another writer before reporting SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Approval queue persisted to a SQLite database file.
pub struct SqliteApprovalQueue {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteApprovalQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteApprovalQueue")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteApprovalQueue {
    /// Open (or create) the queue at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| GuardError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::debug!(path = %path.display(), "opened approval queue");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// A private in-memory database. Same SQL paths, no file.
    pub fn open_in_memory() -> Result<Self, GuardError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// The database file, if this queue is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn decide(&self, id: Uuid, next: ApprovalStatus) -> Result<Option<ApprovalRequest>, GuardError> {
        let conn = self.lock();
        let sql = format!(
            "UPDATE approval_requests SET status = ?1, decided_at = ?2
             WHERE id = ?3 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        let row = conn
            .query_row(
                &sql,
                params![next.as_str(), timestamp(crate::approval::now()), id.to_string()],
                ApprovalRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let request = row.into_request()?;
                tracing::info!(id = %id, action = %request.action, status = %next, "approval decided");
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    fn query(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<ApprovalRequest>, GuardError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, ApprovalRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ApprovalRow::into_request).collect()
    }
}

impl ApprovalBackend for SqliteApprovalQueue {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn submit(
        &self,
        action: &str,
        agent: Option<&str>,
        params: Option<&Map<String, Value>>,
        reason: Option<&str>,
    ) -> Result<ApprovalRequest, GuardError> {
        let request = ApprovalRequest::pending(
            action,
            agent.map(str::to_string),
            params.cloned(),
            reason.map(str::to_string),
        );
        let params_json = request.params.as_ref().map(serde_json::to_string).transpose()?;

        self.lock().execute(
            "INSERT INTO approval_requests (id, action, agent, params, reason, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request.id.to_string(),
                request.action,
                request.agent,
                params_json,
                request.reason,
                request.status.as_str(),
                timestamp(request.created_at),
            ],
        )?;

        tracing::info!(id = %request.id, action = %action, "approval requested");
        Ok(request)
    }

    fn approve(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        self.decide(id, ApprovalStatus::Approved)
    }

    fn deny(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        self.decide(id, ApprovalStatus::Denied)
    }

    fn get_pending(&self) -> Result<Vec<ApprovalRequest>, GuardError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM approval_requests
                 WHERE status = 'pending'
                 ORDER BY created_at ASC, rowid ASC"
            ),
            [],
        )
    }

    fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        let row = self
            .lock()
            .query_row(
                &format!("SELECT {COLUMNS} FROM approval_requests WHERE id = ?1"),
                params![id.to_string()],
                ApprovalRow::from_row,
            )
            .optional()?;
        row.map(ApprovalRow::into_request).transpose()
    }

    fn get_history(&self, limit: usize) -> Result<Vec<ApprovalRequest>, GuardError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM approval_requests
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1"
            ),
            params![limit],
        )
    }
}

/// Raw column values, converted to an ApprovalRequest outside the rusqlite
/// callback so conversion failures surface as `GuardError::CorruptRow`.
struct ApprovalRow {
    id: String,
    action: String,
    agent: Option<String>,
    params: Option<String>,
    reason: Option<String>,
    status: String,
    created_at: String,
    decided_at: Option<String>,
}

impl ApprovalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            action: row.get(1)?,
            agent: row.get(2)?,
            params: row.get(3)?,
            reason: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            decided_at: row.get(7)?,
        })
    }

    fn into_request(self) -> Result<ApprovalRequest, GuardError> {
        let corrupt = |reason: String| GuardError::CorruptRow {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(format!("bad id: {}", e)))?;
        let status = self.status.parse::<ApprovalStatus>().map_err(corrupt)?;
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| corrupt(format!("bad created_at '{}'", self.created_at)))?;
        let decided_at = match self.decided_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw).ok_or_else(|| corrupt(format!("bad decided_at '{}'", raw)))?,
            ),
            None => None,
        };
        let params = match self.params.as_deref() {
            Some(raw) => match serde_json::from_str::<Value>(raw)? {
                Value::Object(map) => Some(map),
                Value::Null => None,
                other => return Err(corrupt(format!("params is not an object: {}", other))),
            },
            None => None,
        };

        Ok(ApprovalRequest {
            id,
            action: self.action,
            agent: self.agent,
            params,
            reason: self.reason,
            status,
            created_at,
            decided_at,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".memvex").join("guard.db");
        let queue = SqliteApprovalQueue::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(queue.path(), Some(path.as_path()));
    }

    #[test]
    fn submit_and_get_preserve_fields() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let params = json!({ "amount": 75, "to": "vendor" }).as_object().cloned().unwrap();
        let req = queue
            .submit("spend_money", Some("agent-1"), Some(&params), Some("over limit"))
            .unwrap();

        let loaded = queue.get(req.id).unwrap().unwrap();
        assert_eq!(loaded.id, req.id);
        assert_eq!(loaded.action, "spend_money");
        assert_eq!(loaded.agent.as_deref(), Some("agent-1"));
        assert_eq!(loaded.reason.as_deref(), Some("over limit"));
        assert_eq!(loaded.params, Some(params));
        assert_eq!(loaded.status, ApprovalStatus::Pending);
        assert!(loaded.decided_at.is_none());
    }

    #[test]
    fn returned_requests_equal_stored_rows() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let params = json!({ "amount": 75 }).as_object().cloned().unwrap();
        let submitted = queue
            .submit("spend_money", Some("agent-1"), Some(&params), Some("over limit"))
            .unwrap();
        assert_eq!(queue.get(submitted.id).unwrap().unwrap(), submitted);
        assert_eq!(queue.get_pending().unwrap(), vec![submitted.clone()]);

        let denied = queue.deny(submitted.id).unwrap().unwrap();
        assert_eq!(queue.get(submitted.id).unwrap().unwrap(), denied);
    }

    #[test]
    fn absent_params_stay_absent() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let req = queue.submit("deploy", None, None, None).unwrap();
        let loaded = queue.get(req.id).unwrap().unwrap();
        assert!(loaded.params.is_none());
        assert!(loaded.agent.is_none());
    }

    #[test]
    fn approve_twice_returns_none_second_time() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let req = queue.submit("deploy", None, None, None).unwrap();

        let approved = queue.approve(req.id).unwrap().unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(approved.decided_at.is_some());
        assert!(queue.approve(req.id).unwrap().is_none());
        assert!(queue.deny(req.id).unwrap().is_none());
    }

    #[test]
    fn unknown_id_is_none() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        assert!(queue.approve(id).unwrap().is_none());
        assert!(queue.get(id).unwrap().is_none());
    }

    #[test]
    fn ordering_breaks_timestamp_ties_by_insertion() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let ids: Vec<Uuid> = (0..5)
            .map(|i| queue.submit(&format!("a{}", i), None, None, None).unwrap().id)
            .collect();

        let pending: Vec<Uuid> = queue.get_pending().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(pending, ids);

        let history: Vec<Uuid> = queue.get_history(3).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(history, vec![ids[4], ids[3], ids[2]]);
    }

    #[test]
    fn corrupt_status_is_reported() {
        let queue = SqliteApprovalQueue::open_in_memory().unwrap();
        let req = queue.submit("deploy", None, None, None).unwrap();
        queue
            .lock()
            .execute(
                "UPDATE approval_requests SET status = 'cancelled' WHERE id = ?1",
                params![req.id.to_string()],
            )
            .unwrap();

        match queue.get(req.id) {
            Err(GuardError::CorruptRow { reason, .. }) => assert!(reason.contains("cancelled")),
            other => panic!("expected CorruptRow, got {:?}", other),
        }
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.db");

        let (pending_id, decided_id) = {
            let queue = SqliteApprovalQueue::open(&path).unwrap();
            let pending = queue.submit("deploy", Some("bot"), None, None).unwrap();
            let decided = queue.submit("spend_money", None, None, None).unwrap();
            queue.deny(decided.id).unwrap();
            (pending.id, decided.id)
        };

        let queue = SqliteApprovalQueue::open(&path).unwrap();
        let pending = queue.get_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, pending_id);

        let decided = queue.get(decided_id).unwrap().unwrap();
        assert_eq!(decided.status, ApprovalStatus::Denied);
        assert!(decided.decided_at.is_some());
    }
}
