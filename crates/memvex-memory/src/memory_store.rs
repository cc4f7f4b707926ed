// memory_store.rs — Volatile in-process memory backend.
//
// Entries are kept in insertion order; reads walk the list backwards so
// results come out newest first, matching the SQLite backend.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::backend::MemoryBackend;
use crate::entry::{MemoryEntry, MemoryQuery, NewMemory};
use crate::error::MemoryError;

/// Memory backend held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryBackend for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn store(&self, new: NewMemory) -> Result<MemoryEntry, MemoryError> {
        let entry = MemoryEntry::create(new);
        self.lock().push(entry.clone());
        Ok(entry)
    }

    fn recall(&self, query: &MemoryQuery) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(self
            .lock()
            .iter()
            .rev()
            .filter(|e| query.matches_filters(e) && query.matches_text(&e.content))
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn forget(&self, id: Uuid) -> Result<bool, MemoryError> {
        let mut entries = self.lock();
        match entries.iter().position(|e| e.id == id) {
            Some(idx) => {
                entries.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list(&self, namespace: Option<&str>) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(self
            .lock()
            .iter()
            .rev()
            .filter(|e| e.in_namespace(namespace))
            .cloned()
            .collect())
    }

    fn clear(&self, namespace: Option<&str>) -> Result<usize, MemoryError> {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| !e.in_namespace(namespace));
        Ok(before - entries.len())
    }
}
