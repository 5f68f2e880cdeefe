//! Record types for experiences, before and after embedding.

use serde::{Deserialize, Serialize};

/// One parsed experience, not yet embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experience {
    pub text: String,
    pub keywords: Vec<String>,
    pub source_url: Option<String>,
}

impl Experience {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keywords: Vec::new(),
            source_url: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn embedded(self, embedding: Vec<f32>) -> StoredExperience {
        StoredExperience {
            keywords: self.keywords,
            text: self.text,
            source_url: self.source_url,
            embedding,
        }
    }
}

/// An experience as persisted in a shard. `source_url` is omitted when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExperience {
    pub keywords: Vec<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub embedding: Vec<f32>,
}

/// Everything persisted for one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonShard {
    pub person: String,
    pub experiences: Vec<StoredExperience>,
}

impl PersonShard {
    /// Common embedding width of the shard, or the first two widths that disagree.
    pub fn dimensions(&self) -> Result<Option<usize>, (usize, usize)> {
        let mut widths = self.experiences.iter().map(|e| e.embedding.len());
        let Some(first) = widths.next() else {
            return Ok(None);
        };
        match widths.find(|w| *w != first) {
            Some(other) => Err((first, other)),
            None => Ok(Some(first)),
        }
    }
}
