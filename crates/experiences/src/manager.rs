/// Experience manager: orchestrates ingest (parse → embed → shard), corpus snapshots,
/// and search.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    serde::Serialize,
    tokio::sync::RwLock,
    tracing::{debug, info},
};

use crate::{
    config::ExperiencesConfig,
    corpus::Corpus,
    embeddings::EmbeddingProvider,
    error::{Error, Result},
    parser::{parse_experiences, parse_experiences_file},
    schema::{Experience, PersonShard},
    search::{self, Match, SearchRequest, SearchResponse},
    shard::{ShardStore, StoreStats, person_slug},
};

pub const EXPERIENCES_FILE: &str = "experiences.txt";

pub struct ExperienceManager {
    config: ExperiencesConfig,
    store: ShardStore,
    embedder: Box<dyn EmbeddingProvider>,
    corpus: RwLock<Arc<Corpus>>,
}

/// Outcome of embedding one person.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub person: String,
    pub experiences: usize,
    pub shard_path: PathBuf,
}

/// Status info about the loaded snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStatus {
    pub people: usize,
    pub experiences: usize,
    pub skipped_shards: usize,
    pub dimensions: Option<usize>,
    pub embedding_model: String,
}

impl ExperienceManager {
    /// The corpus starts empty; call [`reload`](Self::reload) before searching.
    pub fn new(config: ExperiencesConfig, embedder: Box<dyn EmbeddingProvider>) -> Self {
        let store = ShardStore::new(config.shard_dir.clone());
        Self {
            config,
            store,
            embedder,
            corpus: RwLock::new(Arc::new(Corpus::default())),
        }
    }

    pub fn config(&self) -> &ExperiencesConfig {
        &self.config
    }

    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Where the raw experiences for `person` are expected.
    pub fn raw_path(&self, person: &str) -> Result<PathBuf> {
        Ok(self
            .config
            .raw_dir
            .join(person_slug(person)?)
            .join(EXPERIENCES_FILE))
    }

    /// Embed the person's `experiences.txt` and replace their shard.
    pub async fn ingest_person(&self, person: &str) -> Result<IngestReport> {
        let path = self.raw_path(person)?;
        self.ingest_file(person, &path).await
    }

    pub async fn ingest_file(&self, person: &str, path: &Path) -> Result<IngestReport> {
        let experiences = parse_experiences_file(path).await?;
        debug!(%person, path = %path.display(), parsed = experiences.len(), "parsed experiences");
        self.ingest(person, experiences).await
    }

    pub async fn ingest_text(&self, person: &str, raw: &str) -> Result<IngestReport> {
        self.ingest(person, parse_experiences(raw)).await
    }

    async fn ingest(&self, person: &str, experiences: Vec<Experience>) -> Result<IngestReport> {
        let person = person.trim();
        person_slug(person)?;
        if experiences.is_empty() {
            return Err(Error::NoExperiences {
                person: person.to_string(),
            });
        }

        let texts: Vec<String> = experiences.iter().map(|e| e.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "requested {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        let expected = self.config.dimensions.unwrap_or(self.embedder.dimensions());
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let shard = PersonShard {
            person: person.to_string(),
            experiences: experiences
                .into_iter()
                .zip(embeddings)
                .map(|(exp, emb)| exp.embedded(emb))
                .collect(),
        };
        let shard_path = self.store.write(&shard).await?;

        Ok(IngestReport {
            person: shard.person,
            experiences: shard.experiences.len(),
            shard_path,
        })
    }

    /// Rebuild the corpus from disk and swap it in. Searches in flight keep the old one.
    pub async fn reload(&self) -> Arc<Corpus> {
        let fresh = Arc::new(Corpus::load(&self.store, self.config.dimensions).await);
        *self.corpus.write().await = Arc::clone(&fresh);
        fresh
    }

    pub async fn corpus(&self) -> Arc<Corpus> {
        Arc::clone(&*self.corpus.read().await)
    }

    /// Validate, embed the query once, and rank the current snapshot.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let k = request.validate(self.config.default_top_k, self.config.max_top_k)?;
        let query_vec = self.embedder.embed(&request.query).await?;
        let matches = self.search_vector(&query_vec, k).await?;
        info!(top_k = k, returned = matches.len(), "search complete");
        Ok(SearchResponse::new(request.query.clone(), matches))
    }

    /// Rank the current snapshot against an already-embedded query.
    pub async fn search_vector(&self, query: &[f32], top_k: usize) -> Result<Vec<Match>> {
        let corpus = self.corpus().await;
        search::top_k(&corpus, query, top_k)
    }

    /// Totals straight from the shard directory.
    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    pub async fn status(&self) -> CorpusStatus {
        let corpus = self.corpus().await;
        CorpusStatus {
            people: corpus.people(),
            experiences: corpus.len(),
            skipped_shards: corpus.skipped_shards(),
            dimensions: corpus.dimensions(),
            embedding_model: self.embedder.model_name().to_string(),
        }
    }
}
