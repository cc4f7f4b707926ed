// service.rs — MemoryService facade and the backend factory.
//
// The service normalizes caller input before it reaches a backend:
//
// - content must contain non-whitespace text
// - a blank namespace means "no namespace"
// - tags are trimmed, empties dropped, duplicates removed (first kept)
// - a recall limit of 0 means the default limit
//
// Backend selection happens once, in `open_backend`. A persisted backend
// that cannot be opened degrades to the in-memory store with a warning.

use std::path::Path;

use uuid::Uuid;

use crate::backend::MemoryBackend;
use crate::config::{MemoryConfig, StorageKind};
use crate::embeddings::{EmbeddingProvider, NoOpEmbeddingProvider};
use crate::entry::{MemoryEntry, MemoryQuery, NewMemory, DEFAULT_RECALL_LIMIT};
use crate::error::MemoryError;
use crate::memory_store::InMemoryStore;

/// Store/recall/forget/list facade over one backend.
pub struct MemoryService {
    backend: Box<dyn MemoryBackend>,
    embedder: Box<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryService")
            .field("backend", &self.backend.name())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl MemoryService {
    pub fn new(backend: Box<dyn MemoryBackend>) -> Self {
        Self {
            backend,
            embedder: Box::new(NoOpEmbeddingProvider),
        }
    }

    /// A service over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryStore::new()))
    }

    /// Build the service described by `config`.
    ///
    /// `default_path` is used for the SQLite file when `config.path` is unset.
    pub fn from_config(config: &MemoryConfig, default_path: &Path) -> Self {
        Self::new(open_backend(config, default_path))
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingProvider>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub fn store(&self, new: NewMemory) -> Result<MemoryEntry, MemoryError> {
        if new.content.trim().is_empty() {
            return Err(MemoryError::InvalidInput(
                "memory content must not be empty".to_string(),
            ));
        }
        let new = NewMemory {
            namespace: normalize_namespace(new.namespace.as_deref()),
            agent: new.agent.filter(|a| !a.trim().is_empty()),
            tags: new.tags.map(normalize_tags).filter(|t| !t.is_empty()),
            ..new
        };

        let entry = self.backend.store(new)?;
        tracing::info!(
            id = %entry.id,
            namespace = entry.namespace.as_deref().unwrap_or("-"),
            agent = entry.agent.as_deref().unwrap_or("-"),
            "memory stored"
        );
        Ok(entry)
    }

    pub fn recall(&self, query: MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        let query = MemoryQuery {
            namespace: normalize_namespace(query.namespace.as_deref()),
            limit: if query.limit == 0 {
                DEFAULT_RECALL_LIMIT
            } else {
                query.limit
            },
            tags: normalize_tags(query.tags),
            ..query
        };

        let hits = self.backend.recall(&query)?;
        tracing::debug!(query = %query.query, hits = hits.len(), "memory recall");
        self.rerank(&query.query, hits)
    }

    pub fn forget(&self, id: Uuid) -> Result<bool, MemoryError> {
        let removed = self.backend.forget(id)?;
        if removed {
            tracing::info!(id = %id, "memory forgotten");
        }
        Ok(removed)
    }

    pub fn list(&self, namespace: Option<&str>) -> Result<Vec<MemoryEntry>, MemoryError> {
        self.backend.list(normalize_namespace(namespace).as_deref())
    }

    pub fn clear(&self, namespace: Option<&str>) -> Result<usize, MemoryError> {
        let namespace = normalize_namespace(namespace);
        let removed = self.backend.clear(namespace.as_deref())?;
        tracing::info!(
            namespace = namespace.as_deref().unwrap_or("*"),
            removed,
            "memories cleared"
        );
        Ok(removed)
    }

    /// Reorder lexical hits by similarity to the query, most similar first.
    ///
    /// Stable, so entries with equal scores keep their newest-first order.
    /// Does nothing when the provider has no vector for the query.
    fn rerank(&self, query: &str, hits: Vec<MemoryEntry>) -> Result<Vec<MemoryEntry>, MemoryError> {
        if hits.len() < 2 || query.trim().is_empty() {
            return Ok(hits);
        }
        let query_vec = self.embedder.embed(query)?;
        if query_vec.is_empty() {
            return Ok(hits);
        }

        let mut scored = Vec::with_capacity(hits.len());
        for entry in hits {
            let vec = self.embedder.embed(&entry.content)?;
            let score = if vec.is_empty() {
                0.0
            } else {
                self.embedder.similarity(&query_vec, &vec)
            };
            scored.push((score, entry));
        }
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().map(|(_, entry)| entry).collect())
    }
}

/// Pick and open the backend `config` asks for.
pub fn open_backend(config: &MemoryConfig, default_path: &Path) -> Box<dyn MemoryBackend> {
    match config.storage {
        StorageKind::Memory => Box::new(InMemoryStore::new()),
        StorageKind::Sqlite => {
            let path = config.path.as_deref().unwrap_or(default_path);
            open_persisted(path)
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_persisted(path: &Path) -> Box<dyn MemoryBackend> {
    match crate::sqlite_store::SqliteStore::open(path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "SQLite memory store unavailable; using in-memory store"
            );
            Box::new(InMemoryStore::new())
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_persisted(path: &Path) -> Box<dyn MemoryBackend> {
    tracing::warn!(
        path = %path.display(),
        "built without the `sqlite` feature; using in-memory memory store"
    );
    Box::new(InMemoryStore::new())
}

fn normalize_namespace(namespace: Option<&str>) -> Option<String> {
    namespace
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
