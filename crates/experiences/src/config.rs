use std::path::PathBuf;

use crate::search::{DEFAULT_TOP_K, MAX_TOP_K};

/// Configuration for the experience store and search.
#[derive(Debug, Clone)]
pub struct ExperiencesConfig {
    /// Per-person folders holding `experiences.txt`.
    pub raw_dir: PathBuf,
    /// Directory of per-person JSON shards.
    pub shard_dir: PathBuf,
    /// Embedding width every shard must share. `None` lets the first shard decide.
    pub dimensions: Option<usize>,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for ExperiencesConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/celebrities"),
            shard_dir: PathBuf::from("data/vector_db"),
            dimensions: None,
            default_top_k: DEFAULT_TOP_K,
            max_top_k: MAX_TOP_K,
        }
    }
}

impl From<&lifematch_config::LifematchConfig> for ExperiencesConfig {
    fn from(config: &lifematch_config::LifematchConfig) -> Self {
        Self {
            raw_dir: config.data.raw_dir.clone(),
            shard_dir: config.data.shard_dir.clone(),
            dimensions: Some(config.embeddings.dimensions),
            default_top_k: config.search.default_top_k,
            max_top_k: config.search.max_top_k,
        }
    }
}
