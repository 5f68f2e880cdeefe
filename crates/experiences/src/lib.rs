//! Life-experience retrieval: `experiences.txt` → parsed → embedded → per-person JSON
//! shards → in-memory corpus → cosine top-k.

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod embeddings_openai;
pub mod error;
pub mod manager;
pub mod parser;
pub mod schema;
pub mod search;
pub mod shard;
pub mod similarity;

pub use {
    config::ExperiencesConfig,
    corpus::{Corpus, CorpusEntry},
    embeddings::EmbeddingProvider,
    error::{Error, Result},
    manager::{ExperienceManager, IngestReport},
    schema::{Experience, PersonShard, StoredExperience},
    search::{Match, SearchRequest, SearchResponse},
    shard::{ShardStore, StoreStats},
};
