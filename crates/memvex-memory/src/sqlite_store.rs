// sqlite_store.rs — Persisted memory backend on an embedded SQLite file.
//
// Schema (column names are part of the on-disk contract):
//
//   memories(id TEXT PK, content, namespace, agent, tags JSON-text,
//            created_at, expires_at)
//   memories_fts  FTS5 external-content index over memories.content,
//                 kept in sync by the memories_ai/ad/au triggers
//
// Two search modes share one contract:
//
// - FullText: recall goes through `memories_fts MATCH`. The query is split
//   on non-word characters, each token quoted, tokens joined with OR.
// - Substring: used when FTS5 is unavailable (or forced). Recall is a
//   case-insensitive `LIKE '%query%'` over content.
//
// Namespace and tag filters are identical in both modes. Tags are matched
// with `json_each(tags)`, so an entry matches if any stored tag equals any
// requested tag.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::backend::MemoryBackend;
use crate::entry::{MemoryEntry, MemoryQuery, NewMemory};
use crate::error::MemoryError;

const BASE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS memories (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        namespace TEXT,
        agent TEXT,
        tags TEXT,
        created_at TEXT NOT NULL,
        expires_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_memories_namespace ON memories(namespace);
    CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);
";

const FTS_SCHEMA: &str = "
    CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts
        USING fts5(content, content='memories', content_rowid='rowid');

    CREATE TRIGGER IF NOT EXISTS memories_ai AFTER INSERT ON memories BEGIN
        INSERT INTO memories_fts(rowid, content) VALUES (new.rowid, new.content);
    END;

    CREATE TRIGGER IF NOT EXISTS memories_ad AFTER DELETE ON memories BEGIN
        INSERT INTO memories_fts(memories_fts, rowid, content)
        VALUES ('delete', old.rowid, old.content);
    END;

    CREATE TRIGGER IF NOT EXISTS memories_au AFTER UPDATE ON memories BEGIN
        INSERT INTO memories_fts(memories_fts, rowid, content)
        VALUES ('delete', old.rowid, old.content);
        INSERT INTO memories_fts(rowid, content) VALUES (new.rowid, new.content);
    END;
";

const COLUMNS: &str = "m.id, m.content, m.namespace, m.agent, m.tags, m.created_at, m.expires_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How `recall` matches query text against content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// FTS5 index, OR of quoted tokens.
    FullText,
    /// `LIKE '%query%'` over content.
    Substring,
}

/// Memory backend persisted to a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    mode: SearchMode,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) the store at `path`, using full-text search when the
    /// linked SQLite has FTS5.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        Self::open_with(path.as_ref(), SearchMode::FullText)
    }

    /// Open the store in substring mode regardless of FTS5 availability.
    pub fn open_substring(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        Self::open_with(path.as_ref(), SearchMode::Substring)
    }

    /// A private in-memory database in full-text mode.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        let mode = init_schema(&conn, SearchMode::FullText)?;
        Ok(Self {
            conn: Mutex::new(conn),
            mode,
            path: None,
        })
    }

    fn open_with(path: &Path, preferred: SearchMode) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| MemoryError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        let mode = init_schema(&conn, preferred)?;

        tracing::debug!(path = %path.display(), mode = ?mode, "opened memory store");
        Ok(Self {
            conn: Mutex::new(conn),
            mode,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query(&self, sql: &str, args: Vec<SqlValue>) -> Result<Vec<MemoryEntry>, MemoryError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), MemoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(MemoryRow::into_entry).collect()
    }
}

/// Create tables and, if wanted, the FTS index. Returns the mode in effect.
fn init_schema(conn: &Connection, preferred: SearchMode) -> Result<SearchMode, MemoryError> {
    conn.execute_batch(BASE_SCHEMA)?;
    if preferred == SearchMode::Substring {
        return Ok(SearchMode::Substring);
    }

    let had_index = table_exists(conn, "memories_fts")?;
    match conn.execute_batch(FTS_SCHEMA) {
        Ok(()) => {
            if !had_index {
                // Rows written before the index existed would otherwise be invisible.
                conn.execute("INSERT INTO memories_fts(memories_fts) VALUES ('rebuild')", [])?;
            }
            Ok(SearchMode::FullText)
        }
        Err(e) if e.to_string().contains("no such module") => {
            tracing::warn!(error = %e, "FTS5 unavailable; memory recall uses substring matching");
            Ok(SearchMode::Substring)
        }
        Err(e) => Err(e.into()),
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, MemoryError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl MemoryBackend for SqliteStore {
    fn name(&self) -> &'static str {
        match self.mode {
            SearchMode::FullText => "sqlite",
            SearchMode::Substring => "sqlite-like",
        }
    }

    fn store(&self, new: NewMemory) -> Result<MemoryEntry, MemoryError> {
        let entry = MemoryEntry::create(new);
        let tags_json = entry.tags.as_ref().map(serde_json::to_string).transpose()?;

        self.lock().execute(
            "INSERT INTO memories (id, content, namespace, agent, tags, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.content,
                entry.namespace,
                entry.agent,
                tags_json,
                timestamp(entry.created_at),
                entry.expires_at.map(timestamp),
            ],
        )?;
        Ok(entry)
    }

    fn recall(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let mut sql = format!("SELECT {COLUMNS} FROM memories m");
        let mut conditions: Vec<String> = Vec::new();
        let mut args: Vec<SqlValue> = Vec::new();

        let text = query.query.trim();
        if !text.is_empty() {
            match self.mode {
                SearchMode::FullText => {
                    let Some(fts) = sanitize_fts_query(text) else {
                        // Nothing searchable left (e.g., only punctuation).
                        return Ok(Vec::new());
                    };
                    sql.push_str(" JOIN memories_fts ON m.rowid = memories_fts.rowid");
                    conditions.push("memories_fts MATCH ?".to_string());
                    args.push(SqlValue::Text(fts));
                }
                SearchMode::Substring => {
                    conditions.push("m.content LIKE ? ESCAPE '\\'".to_string());
                    args.push(SqlValue::Text(format!("%{}%", escape_like(text))));
                }
            }
        }

        if let Some(ns) = &query.namespace {
            conditions.push("m.namespace = ?".to_string());
            args.push(SqlValue::Text(ns.clone()));
        }

        if !query.tags.is_empty() {
            let placeholders = vec!["?"; query.tags.len()].join(", ");
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(m.tags) WHERE json_each.value IN ({placeholders}))"
            ));
            args.extend(query.tags.iter().cloned().map(SqlValue::Text));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY m.created_at DESC, m.rowid DESC LIMIT ?");
        args.push(SqlValue::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));

        self.query(&sql, args)
    }

    fn forget(&self, id: Uuid) -> Result<bool, MemoryError> {
        let removed = self
            .lock()
            .execute("DELETE FROM memories WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn list(&self, namespace: Option<&str>) -> Result<Vec<MemoryEntry>, MemoryError> {
        match namespace {
            Some(ns) => self.query(
                &format!(
                    "SELECT {COLUMNS} FROM memories m WHERE m.namespace = ?
                     ORDER BY m.created_at DESC, m.rowid DESC"
                ),
                vec![SqlValue::Text(ns.to_string())],
            ),
            None => self.query(
                &format!("SELECT {COLUMNS} FROM memories m ORDER BY m.created_at DESC, m.rowid DESC"),
                Vec::new(),
            ),
        }
    }

    fn clear(&self, namespace: Option<&str>) -> Result<usize, MemoryError> {
        let conn = self.lock();
        let removed = match namespace {
            Some(ns) => conn.execute("DELETE FROM memories WHERE namespace = ?1", params![ns])?,
            None => conn.execute("DELETE FROM memories", [])?,
        };
        Ok(removed)
    }
}

/// Turn free text into an FTS5 query: word tokens, each quoted, OR-joined.
///
/// Returns `None` when no word characters remain.
pub fn sanitize_fts_query(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    let tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|token| format!("\"{}\"", token))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

struct MemoryRow {
    id: String,
    content: String,
    namespace: Option<String>,
    agent: Option<String>,
    tags: Option<String>,
    created_at: String,
    expires_at: Option<String>,
}

impl MemoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            namespace: row.get(2)?,
            agent: row.get(3)?,
            tags: row.get(4)?,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<MemoryEntry, MemoryError> {
        let corrupt = |reason: String| MemoryError::CorruptRow {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(format!("bad id: {}", e)))?;
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| corrupt(format!("bad created_at '{}'", self.created_at)))?;
        let expires_at = match self.expires_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw).ok_or_else(|| corrupt(format!("bad expires_at '{}'", raw)))?,
            ),
            None => None,
        };
        let tags = self
            .tags
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()?;

        Ok(MemoryEntry {
            id,
            content: self.content,
            namespace: self.namespace,
            agent: self.agent,
            tags,
            created_at,
            expires_at,
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
