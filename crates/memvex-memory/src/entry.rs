// entry.rs — MemoryEntry, the input it is created from, and recall queries.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of results `recall` returns when no limit is given.
pub const DEFAULT_RECALL_LIMIT: usize = 10;

/// A stored memory. Immutable once created; removed only by `forget`/`clear`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Assigned by the backend at creation.
    pub id: Uuid,

    pub content: String,

    /// Free-text grouping label (e.g., "work", "project:atlas").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Which agent stored this memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    pub created_at: DateTime<Utc>,

    /// Stored verbatim. No backend filters or purges expired entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    /// Build an entry from `new`, assigning a fresh id and the current time.
    pub fn create(new: NewMemory) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: new.content,
            namespace: new.namespace,
            agent: new.agent,
            tags: new.tags,
            created_at: Utc::now().trunc_subsecs(3),
            expires_at: new.expires_at.map(|at| at.trunc_subsecs(3)),
        }
    }

    /// True when the entry carries at least one of `wanted`.
    ///
    /// An empty `wanted` list imposes no constraint.
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        if wanted.is_empty() {
            return true;
        }
        match &self.tags {
            Some(tags) => tags.iter().any(|t| wanted.contains(t)),
            None => false,
        }
    }

    pub fn in_namespace(&self, namespace: Option<&str>) -> bool {
        match namespace {
            Some(ns) => self.namespace.as_deref() == Some(ns),
            None => true,
        }
    }
}

/// Everything `store` needs; the backend supplies id and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemory {
    pub content: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewMemory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Parameters for `recall`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryQuery {
    /// Text to match. Blank matches every entry.
    pub query: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Entry must carry at least one of these. Empty means no tag filter.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_limit() -> usize {
    DEFAULT_RECALL_LIMIT
}

impl MemoryQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            namespace: None,
            limit: DEFAULT_RECALL_LIMIT,
            tags: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive substring match, the volatile backend's search policy.
    pub fn matches_text(&self, content: &str) -> bool {
        let needle = self.query.trim();
        needle.is_empty() || content.to_lowercase().contains(&needle.to_lowercase())
    }

    /// All non-text filters: namespace and tag intersection.
    pub fn matches_filters(&self, entry: &MemoryEntry) -> bool {
        entry.in_namespace(self.namespace.as_deref()) && entry.has_any_tag(&self.tags)
    }
}
