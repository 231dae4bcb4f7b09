//! Semantic search over a catalog of family-friendly activities.
//!
//! The catalog is a CSV table with at least a `name` column. Names are
//! embedded once, indexed, and queried through [`SemanticSearchService`].

pub mod catalog;
pub mod config;
pub mod semantic;
#[cfg(test)]
mod tests;

pub use catalog::{DataSource, DataSourceError, Item, ItemCatalog, RowOutOfRange};
pub use semantic::{SemanticSearchError, SemanticSearchService};
