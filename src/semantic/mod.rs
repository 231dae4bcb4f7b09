//! Semantic search infrastructure for activity names.
//!
//! This module provides local semantic search using fastembed-rs for
//! generating embeddings and an exact in-memory nearest-neighbour index.
//!
//! # Architecture
//!
//! - `embeddings`: Embedder/ModelLoader traits and the fastembed wrapper
//! - `index`: Flat vector index ranked by squared L2 distance
//! - `guard`: Run-once initialization with retry after failure
//! - `service`: High-level semantic search service

pub mod embeddings;
mod guard;
mod index;
mod service;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel, FastEmbedLoader, ModelLoader};
pub use guard::{InitGuard, InitState};
pub use index::{IndexError, SearchResult, VectorIndex};
pub use service::{
    InitError, ScoredItem, SearchConfig, SemanticSearchError, SemanticSearchService,
    DEFAULT_TOP_K,
};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
