//! Exact in-memory vector index with squared L2 distance.
//!
//! Vectors are stored contiguously in catalog order; a vector's position is
//! its row index. The index is built once and is read-only afterwards.

use std::cmp::Ordering;

use rayon::prelude::*;

/// Search result from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Catalog row the vector was built from
    pub row: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch at row {row}: expected {expected}, got {got}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Query dimension mismatch: expected {expected}, got {got}")]
    QueryDimensionMismatch { expected: usize, got: usize },
}

/// Flat k-nearest-neighbour index.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Row-major vector data, `len * dimensions` values
    data: Vec<f32>,
    dimensions: usize,
    len: usize,
}

impl VectorIndex {
    /// Build an index over `vectors`, in the given order.
    pub fn build(dimensions: usize, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let len = vectors.len();
        let mut data = Vec::with_capacity(len * dimensions);

        for (row, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    row,
                    expected: dimensions,
                    got: vector.len(),
                });
            }
            data.extend(vector);
        }

        Ok(Self {
            data,
            dimensions,
            len,
        })
    }

    /// Get the vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the number of indexed vectors.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find the `k` nearest vectors to `query`.
    ///
    /// Results are sorted by ascending distance, ties broken by lower row.
    /// Returns at most `len()` results; `k == 0` and an empty index yield an
    /// empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, IndexError> {
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }

        if query.len() != self.dimensions {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let mut results: Vec<SearchResult> = if self.dimensions == 0 {
            (0..self.len)
                .map(|row| SearchResult { row, distance: 0.0 })
                .collect()
        } else {
            self.data
                .par_chunks_exact(self.dimensions)
                .enumerate()
                .map(|(row, vector)| SearchResult {
                    row,
                    distance: squared_l2(query, vector),
                })
                .collect()
        };

        let k = k.min(results.len());
        if k < results.len() {
            results.select_nth_unstable_by(k - 1, Self::rank);
            results.truncate(k);
        }
        results.sort_unstable_by(Self::rank);

        Ok(results)
    }

    fn rank(a: &SearchResult, b: &SearchResult) -> Ordering {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.row.cmp(&b.row))
    }
}

/// Squared Euclidean distance between two vectors of equal length.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
