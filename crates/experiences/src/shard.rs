//! Per-person JSON shards on disk.

use std::path::{Path, PathBuf};

use {
    serde::Serialize,
    tracing::{debug, info, warn},
    walkdir::WalkDir,
};

use crate::{
    error::{Error, Result},
    schema::PersonShard,
};

pub const SHARD_EXTENSION: &str = "json";

/// Filesystem-safe shard name: lowercase, spaces to underscores, periods removed.
///
/// Distinct names that normalize identically share a shard; the later write wins.
pub fn person_slug(person: &str) -> Result<String> {
    let slug: String = person
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('.', "");
    let usable = !slug.is_empty()
        && !slug.contains(['/', '\\'])
        && slug.chars().any(|c| c.is_alphanumeric());
    if usable {
        Ok(slug)
    } else {
        Err(Error::InvalidPerson(person.to_string()))
    }
}

/// Totals over the shard directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_people: usize,
    pub total_experiences: usize,
    pub corrupt_shards: usize,
}

#[derive(Debug, Clone)]
pub struct ShardStore {
    dir: PathBuf,
}

impl ShardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn shard_path(&self, person: &str) -> Result<PathBuf> {
        Ok(self
            .dir
            .join(format!("{}.{SHARD_EXTENSION}", person_slug(person)?)))
    }

    /// Replace the person's shard with `shard`. Prior content is not merged.
    pub async fn write(&self, shard: &PersonShard) -> Result<PathBuf> {
        if shard.person.trim().is_empty() {
            return Err(Error::InvalidPerson(shard.person.clone()));
        }
        let path = self.shard_path(&shard.person)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::io(format!("creating {}", self.dir.display()), e))?;

        let body = serde_json::to_vec_pretty(shard).map_err(|e| Error::CorruptShard {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;

        info!(
            person = %shard.person,
            path = %path.display(),
            experiences = shard.experiences.len(),
            "wrote shard"
        );
        Ok(path)
    }

    pub async fn read_person(&self, person: &str) -> Result<PersonShard> {
        read_shard(&self.shard_path(person)?).await
    }

    /// Shard files in the directory, sorted by file name. A missing directory is empty.
    pub fn list(&self) -> Vec<PathBuf> {
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "shard directory does not exist");
            return Vec::new();
        }
        WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "failed to read shard directory entry");
                    None
                },
            })
            .map(walkdir::DirEntry::into_path)
            .filter(|p| is_shard_file(p))
            .collect()
    }

    pub async fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for path in self.list() {
            match read_shard(&path).await {
                Ok(shard) => {
                    stats.total_people += 1;
                    stats.total_experiences += shard.experiences.len();
                },
                Err(e) => {
                    warn!(error = %e, "skipping shard in stats");
                    stats.corrupt_shards += 1;
                },
            }
        }
        stats
    }
}

fn is_shard_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SHARD_EXTENSION)
}

/// Read and validate one shard file.
pub async fn read_shard(path: &Path) -> Result<PersonShard> {
    let corrupt = |reason: String| Error::CorruptShard {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| corrupt(e.to_string()))?;
    let shard: PersonShard = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;

    if shard.person.trim().is_empty() {
        return Err(corrupt("empty person".into()));
    }
    if let Some(idx) = shard
        .experiences
        .iter()
        .position(|e| e.text.trim().is_empty())
    {
        return Err(corrupt(format!("experience {idx} has empty text")));
    }
    if let Some(idx) = shard
        .experiences
        .iter()
        .position(|e| e.embedding.is_empty())
    {
        return Err(corrupt(format!("experience {idx} has an empty embedding")));
    }
    Ok(shard)
}
