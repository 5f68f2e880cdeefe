//! Configuration for lifematch: a TOML file plus environment overrides.
//!
//! Lookup order for the file is an explicit path, then `./lifematch.toml`, then the
//! platform config directory. Missing files fall back to defaults; environment variables
//! are applied last and the result is validated before it is handed out.

use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

pub const CONFIG_FILE_NAME: &str = "lifematch.toml";

/// Upper bound accepted for `search.max_top_k`.
pub const TOP_K_CEILING: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration value threaded into every component.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LifematchConfig {
    pub data: DataConfig,
    pub embeddings: EmbeddingsConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Per-person folders holding `experiences.txt`.
    pub raw_dir: PathBuf,
    /// One JSON shard per person.
    pub shard_dir: PathBuf,
}

impl DataConfig {
    /// Lay out both directories under one data root.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_dir: root.join("celebrities"),
            shard_dir: root.join("vector_db"),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::rooted_at("data")
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<Secret<String>>,
}

fn deserialize_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(Secret::new))
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl EmbeddingsConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: TOP_K_CEILING,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".into(),
        }
    }
}

impl LifematchConfig {
    /// Resolve, parse, override from the process environment, and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            },
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply environment overrides through `lookup` so tests need not touch the
    /// process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("LIFEMATCH_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data = DataConfig::rooted_at(dir);
        }
        if let Some(bind) = lookup("LIFEMATCH_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
        if let Some(url) = lookup("LIFEMATCH_EMBEDDINGS_BASE_URL").filter(|v| !v.is_empty()) {
            self.embeddings.base_url = url;
        }
        if let Some(model) = lookup("LIFEMATCH_EMBEDDINGS_MODEL").filter(|v| !v.is_empty()) {
            self.embeddings.model = model;
        }
        if let Some(dims) = lookup("LIFEMATCH_EMBEDDINGS_DIMENSIONS") {
            self.embeddings.dimensions = dims.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "LIFEMATCH_EMBEDDINGS_DIMENSIONS",
                value: dims.clone(),
            })?;
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.embeddings.api_key = Some(Secret::new(key));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "embeddings.dimensions must be greater than zero".into(),
            ));
        }
        if self.search.max_top_k == 0 || self.search.max_top_k > TOP_K_CEILING {
            return Err(ConfigError::Invalid(format!(
                "search.max_top_k must be between 1 and {TOP_K_CEILING}"
            )));
        }
        if self.search.default_top_k == 0 || self.search.default_top_k > self.search.max_top_k {
            return Err(ConfigError::Invalid(format!(
                "search.default_top_k must be between 1 and {}",
                self.search.max_top_k
            )));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    directories::ProjectDirs::from("org", "lifematch", "lifematch")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}
