//! Semantic search service for activity similarity search.
//!
//! Provides a high-level interface for semantic search operations:
//! - Lazy (or eager) loading of the catalog, embedding model and vector index
//! - Coordinates query embedding and nearest-neighbour search
//! - Thread-safe; initialization runs at most once across callers

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{DataSource, DataSourceError, Item, ItemCatalog, RowOutOfRange};
use crate::semantic::embeddings::{Embedder, EmbeddingError, ModelLoader};
use crate::semantic::guard::{InitGuard, InitState};
use crate::semantic::index::{IndexError, VectorIndex};

/// Number of results returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_K: usize = 5;

/// Settings for a [`SemanticSearchService`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Dataset location, resolved once at initialization
    pub dataset: DataSource,
    /// Initialize while constructing the service instead of on first query
    pub eager: bool,
}

/// Errors that can occur while initializing the search state.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Embedding error: {0}")]
    Model(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedded {vectors} vectors for {items} catalog rows")]
    VectorCountMismatch { items: usize, vectors: usize },
}

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Semantic search unavailable: {0}")]
    Unavailable(#[source] Arc<InitError>),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Catalog error: {0}")]
    Row(#[from] RowOutOfRange),
}

/// A search hit with its distance from the query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: Item,
    pub distance: f32,
}

/// Fully built search components. Immutable once constructed.
struct SearchState {
    catalog: ItemCatalog,
    model: Box<dyn Embedder>,
    index: VectorIndex,
}

/// Service for semantic search over the activity catalog.
///
/// Owns the catalog, model and index; share it between callers with `Arc`.
pub struct SemanticSearchService {
    config: SearchConfig,
    loader: Arc<dyn ModelLoader>,
    state: InitGuard<SearchState, InitError>,
}

impl SemanticSearchService {
    /// Create a new semantic search service.
    ///
    /// With `config.eager` the catalog, model and index are built before
    /// returning; otherwise the first search builds them.
    pub fn new(
        config: SearchConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, SemanticSearchError> {
        let service = Self {
            config,
            loader,
            state: InitGuard::new(),
        };

        if service.config.eager {
            service.initialize()?;
        }

        Ok(service)
    }

    /// Return the `top_k` catalog rows whose names are closest to `query`,
    /// nearest first.
    pub fn semantic_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Item>, SemanticSearchError> {
        Ok(self
            .semantic_search_with_scores(query, top_k)?
            .into_iter()
            .map(|scored| scored.item)
            .collect())
    }

    /// Same as `semantic_search()` but keeps the distance of each hit.
    pub fn semantic_search_with_scores(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredItem>, SemanticSearchError> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        let state = self.ensure_initialized()?;

        if state.index.is_empty() {
            return Ok(vec![]);
        }

        let query_embedding = state.model.embed_one(query)?;

        let k = top_k.min(state.index.len());
        let results = state.index.search(&query_embedding, k)?;

        results
            .into_iter()
            .map(|result| -> Result<ScoredItem, SemanticSearchError> {
                let item = state.catalog.row_at(result.row)?.clone();
                Ok(ScoredItem {
                    item,
                    distance: result.distance,
                })
            })
            .collect()
    }

    /// Force initialization of the service.
    ///
    /// Normally initialization happens lazily on first search.
    pub fn initialize(&self) -> Result<(), SemanticSearchError> {
        self.ensure_initialized().map(|_| ())
    }

    /// Check if the service has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.state() == InitState::Ready
    }

    pub fn state(&self) -> InitState {
        self.state.state()
    }

    /// Get the number of indexed entries.
    ///
    /// Returns 0 if not yet initialized.
    pub fn indexed_count(&self) -> usize {
        self.state.get().map(|s| s.index.len()).unwrap_or(0)
    }

    /// Embedding dimensions, if initialized.
    pub fn dimensions(&self) -> Option<usize> {
        self.state.get().map(|s| s.index.dimensions())
    }

    fn ensure_initialized(&self) -> Result<Arc<SearchState>, SemanticSearchError> {
        self.state
            .get_or_try_init(|| self.do_init())
            .map_err(SemanticSearchError::Unavailable)
    }

    /// Perform actual initialization.
    fn do_init(&self) -> Result<SearchState, InitError> {
        log::info!("Initializing semantic search from '{}'", self.config.dataset);
        let now = Instant::now();

        let result = self.build_state();

        match &result {
            Ok(state) => log::info!(
                "Semantic search ready: {} rows indexed in {}ms",
                state.index.len(),
                now.elapsed().as_millis()
            ),
            Err(e) => log::warn!("Semantic search initialization failed: {}", e),
        }

        result
    }

    fn build_state(&self) -> Result<SearchState, InitError> {
        let catalog = ItemCatalog::load(&self.config.dataset)?;
        let model = self.loader.load()?;

        let vectors = model.embed(&catalog.names())?;
        if vectors.len() != catalog.row_count() {
            return Err(InitError::VectorCountMismatch {
                items: catalog.row_count(),
                vectors: vectors.len(),
            });
        }

        let index = VectorIndex::build(model.dimensions(), vectors)?;

        Ok(SearchState {
            catalog,
            model,
            index,
        })
    }
}
