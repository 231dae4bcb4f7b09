//! Deterministic embedders and dataset fixtures shared by tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::DataSource;
use crate::semantic::{Embedder, EmbeddingError, ModelLoader};

/// Words the keyword embedder knows about; one dimension each.
const VOCABULARY: [&str; 8] = [
    "zoo", "city", "kids", "museum", "beach", "park", "art", "science",
];

/// Embeds text as a bag of known keywords.
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let words: Vec<&str> = lower.split_whitespace().collect();
                VOCABULARY
                    .iter()
                    .map(|term| words.iter().filter(|w| *w == term).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Counts loads so tests can assert how often initialization ran.
pub struct KeywordLoader {
    loads: AtomicUsize,
    delay: Option<Duration>,
    fail: bool,
}

impl KeywordLoader {
    pub const DIMENSIONS: usize = VOCABULARY.len();

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            delay: None,
            fail: false,
        })
    }

    /// A loader that takes `delay` to load, widening race windows.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            delay: Some(delay),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            delay: None,
            fail: true,
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for KeywordLoader {
    fn load(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err(EmbeddingError::ModelUnavailable("weights missing".to_string()));
        }
        Ok(Box::new(KeywordEmbedder))
    }
}

/// Embeds exact texts to fixed vectors; unknown text maps to the origin.
pub struct TableEmbedder {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
}

impl Embedder for TableEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                self.table
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimensions])
            })
            .collect())
    }
}

pub struct TableLoader {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
}

impl TableLoader {
    pub fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Arc<Self> {
        Arc::new(Self {
            dimensions,
            table: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
        })
    }
}

impl ModelLoader for TableLoader {
    fn load(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        Ok(Box::new(TableEmbedder {
            dimensions: self.dimensions,
            table: self.table.clone(),
        }))
    }
}

/// Write a two-column `name,state` CSV into `dir` and return its source.
pub fn activities_csv(dir: &Path, names: &[&str]) -> DataSource {
    let path = dir.join("activities.csv");
    let mut wrt = csv::Writer::from_path(&path).unwrap();
    wrt.write_record(["name", "state"]).unwrap();
    for (idx, name) in names.iter().enumerate() {
        wrt.write_record([name.to_string(), format!("S{idx}")]).unwrap();
    }
    wrt.flush().unwrap();

    DataSource::Path(path)
}
