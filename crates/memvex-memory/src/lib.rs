//! # memvex-memory
//!
//! Cross-agent memory for memvex: "agent A learns something, agent B knows it."
//!
//! Any agent can [`MemoryService::store`] a fact and any other agent can
//! [`MemoryService::recall`] it by text, optionally narrowed by namespace and
//! tags. Storage sits behind the [`MemoryBackend`] trait with a volatile
//! [`InMemoryStore`] and a persisted `SqliteStore` (full-text or substring
//! search).
//!
//! ## Key invariants
//!
//! - **Backend-assigned identity**: ids and `created_at` come from the
//!   backend, never the caller.
//! - **Newest first**: `recall` and `list` order by creation time descending.
//! - **Same file, same memories**: two stores opened on one path share
//!   state; different paths never see each other's writes.
//! - **Expiry is data, not policy**: `expires_at` is stored and returned but
//!   never enforced.

pub mod backend;
pub mod config;
pub mod embeddings;
pub mod entry;
pub mod error;
pub mod memory_store;
pub mod service;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;

pub use backend::MemoryBackend;
pub use config::{MemoryConfig, StorageKind};
pub use embeddings::{cosine_similarity, EmbeddingProvider, NoOpEmbeddingProvider};
pub use entry::{MemoryEntry, MemoryQuery, NewMemory, DEFAULT_RECALL_LIMIT};
pub use error::MemoryError;
pub use memory_store::InMemoryStore;
pub use service::{open_backend, MemoryService};
#[cfg(feature = "sqlite")]
pub use sqlite_store::{SearchMode, SqliteStore};
