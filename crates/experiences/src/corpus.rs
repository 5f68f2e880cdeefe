//! In-memory union of every shard, rebuilt from disk on load and never mutated after.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::Error,
    schema::StoredExperience,
    shard::{ShardStore, read_shard},
};

/// One experience paired with its owning person.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub person: Arc<str>,
    pub experience: StoredExperience,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    dimensions: Option<usize>,
    people: usize,
    skipped_shards: usize,
}

impl Corpus {
    /// Load every readable shard in file-name order.
    ///
    /// `expected_dims` pins the embedding width; otherwise the first embedded shard fixes
    /// it. Shards that fail to parse or disagree on width are skipped with a warning.
    pub async fn load(store: &ShardStore, expected_dims: Option<usize>) -> Self {
        let mut corpus = Self {
            dimensions: expected_dims,
            ..Self::default()
        };

        let paths = store.list();
        if paths.is_empty() {
            warn!(dir = %store.dir().display(), "no shards found, corpus is empty");
        }

        for path in paths {
            let shard = match read_shard(&path).await {
                Ok(shard) => shard,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable shard");
                    corpus.skipped_shards += 1;
                    continue;
                },
            };

            let width = match shard.dimensions() {
                Ok(width) => width,
                Err((first, other)) => {
                    warn!(
                        path = %path.display(),
                        first,
                        other,
                        "skipping shard with mixed embedding widths"
                    );
                    corpus.skipped_shards += 1;
                    continue;
                },
            };

            if let (Some(expected), Some(actual)) = (corpus.dimensions, width)
                && expected != actual
            {
                let e = Error::DimensionMismatch { expected, actual };
                warn!(path = %path.display(), error = %e, "skipping shard");
                corpus.skipped_shards += 1;
                continue;
            }
            if corpus.dimensions.is_none() {
                corpus.dimensions = width;
            }

            let person: Arc<str> = Arc::from(shard.person.as_str());
            corpus.people += 1;
            corpus
                .entries
                .extend(shard.experiences.into_iter().map(|experience| CorpusEntry {
                    person: Arc::clone(&person),
                    experience,
                }));
        }

        info!(
            people = corpus.people,
            experiences = corpus.entries.len(),
            skipped = corpus.skipped_shards,
            "loaded corpus"
        );
        corpus
    }

    /// Build directly from entries, e.g. for tests or alternative stores.
    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        let dimensions = entries.first().map(|e| e.experience.embedding.len());
        let mut people: Vec<&str> = entries.iter().map(|e| e.person.as_ref()).collect();
        people.sort_unstable();
        people.dedup();
        let people = people.len();
        Self {
            entries,
            dimensions,
            people,
            skipped_shards: 0,
        }
    }

    /// Entries in scan order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn people(&self) -> usize {
        self.people
    }

    pub fn skipped_shards(&self) -> usize {
        self.skipped_shards
    }
}
