use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::catalog::DataSource;
use crate::semantic::{FastEmbedLoader, SearchConfig, DEFAULT_MODEL};

const CONFIG_FILE: &str = "config.yaml";

/// Dataset used when neither the environment nor the config names one.
pub const DEFAULT_DATASET: &str = "data/processed/family_friendly_dataset.csv";

/// Environment variables naming the dataset, highest priority first.
pub const DATASET_ENV_VARS: [&str; 3] = [
    "FAMILY_DATASET_URL",
    "FAMILY_DATA_SOURCE",
    "FAMILY_DATA_URL",
];

/// Overrides the base directory (config file and model cache).
pub const HOME_ENV_VAR: &str = "ACTIVITY_SEARCH_HOME";

/// Forces eager initialization when set to a truthy value.
pub const EAGER_ENV_VAR: &str = "ACTIVITY_SEARCH_EAGER";

/// Configuration for semantic search functionality
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SemanticSearchConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_semantic_model")]
    pub model: String,

    /// Show a progress bar while the model downloads
    #[serde(default = "default_show_download_progress")]
    pub show_download_progress: bool,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            show_download_progress: true,
        }
    }
}

fn default_semantic_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_show_download_progress() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Dataset path or http(s) URL
    #[serde(default)]
    pub dataset: Option<String>,
    /// Build the index at startup instead of on the first query
    #[serde(default)]
    pub eager: bool,
    #[serde(default)]
    pub semantic_search: SemanticSearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    /// Load `config.yaml` from `base_path` (defaults when absent), then apply
    /// environment overrides.
    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        Self::load_from(base_path, |key| std::env::var(key).ok())
    }

    /// Like `load_with`, looking environment overrides up through `var`.
    pub fn load_from(
        base_path: &Path,
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::read_file(base_path)?;
        config.apply_overrides(var);
        config.validate()?;
        Ok(config)
    }

    fn read_file(base_path: &Path) -> anyhow::Result<Self> {
        let path = base_path.join(CONFIG_FILE);

        let mut config: Self = if path.exists() {
            let config_str = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yml::from_str(&config_str)
                .with_context(|| format!("config is malformed: {}", path.display()))?
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            Self::default()
        };

        config.base_path = base_path.to_path_buf();
        Ok(config)
    }

    /// Apply environment-style overrides looked up through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dataset) = DATASET_ENV_VARS
            .iter()
            .filter_map(|key| var(*key))
            .find(|value| !value.trim().is_empty())
        {
            self.dataset = Some(dataset);
        }

        if let Some(eager) = var(EAGER_ENV_VAR) {
            self.eager = matches!(
                eager.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.semantic_search.model.trim().is_empty() {
            bail!("semantic_search.model must not be empty");
        }

        if let Some(dataset) = &self.dataset {
            if dataset.trim().is_empty() {
                bail!("dataset must not be empty");
            }
        }

        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn dataset_source(&self) -> DataSource {
        DataSource::parse(self.dataset.as_deref().unwrap_or(DEFAULT_DATASET))
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            dataset: self.dataset_source(),
            eager: self.eager,
        }
    }

    /// Loader for the configured fastembed model, cached under `<base>/models`.
    pub fn model_loader(&self) -> FastEmbedLoader {
        FastEmbedLoader {
            model: self.semantic_search.model.clone(),
            cache_dir: self.base_path.join("models"),
            show_download_progress: self.semantic_search.show_download_progress,
        }
    }
}

/// `$ACTIVITY_SEARCH_HOME`, or `~/.local/share/activity-search`.
pub fn default_base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var(HOME_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .context("could not determine home directory")?
        .context("home directory path is empty")?;
    Ok(home.join(".local/share/activity-search"))
}
