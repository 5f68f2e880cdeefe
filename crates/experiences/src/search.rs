//! Brute-force nearest-neighbour search over a loaded [`Corpus`].

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{
    corpus::Corpus,
    error::{Error, Result},
    similarity::{cosine_similarity, rank_descending},
};

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 50;

/// A ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub person: String,
    pub similarity: f64,
    pub keywords: Vec<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Score every experience against `query` and keep the best `top_k`.
///
/// Results are ordered by descending similarity; ties keep corpus scan order. An empty
/// corpus yields no matches. The query width must equal the corpus width.
pub fn top_k(corpus: &Corpus, query: &[f32], top_k: usize) -> Result<Vec<Match>> {
    if top_k == 0 || corpus.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(expected) = corpus.dimensions()
        && expected != query.len()
    {
        return Err(Error::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }

    let mut scored: Vec<(f64, usize)> = Vec::with_capacity(corpus.len());
    for (idx, entry) in corpus.entries().iter().enumerate() {
        match cosine_similarity(query, &entry.experience.embedding) {
            Ok(score) => scored.push((score, idx)),
            Err(e) => warn!(person = %entry.person, error = %e, "skipping experience"),
        }
    }

    rank_descending(&mut scored, |(score, _)| *score);
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(similarity, idx)| {
            let entry = &corpus.entries()[idx];
            Match {
                person: entry.person.to_string(),
                similarity,
                keywords: entry.experience.keywords.clone(),
                text: entry.experience.text.clone(),
                source_url: entry.experience.source_url.clone(),
            }
        })
        .collect())
}

/// Search request as accepted by the HTTP API and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, top_k: Option<i64>) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }

    /// Check the query and resolve `top_k` against `default_top_k` and `max_top_k`.
    pub fn validate(&self, default_top_k: usize, max_top_k: usize) -> Result<usize> {
        if self.query.trim().is_empty() {
            return Err(Error::validation("Query must be a non-empty string"));
        }
        let Some(requested) = self.top_k else {
            return Ok(default_top_k);
        };
        match usize::try_from(requested) {
            Ok(k) if (1..=max_top_k).contains(&k) => Ok(k),
            _ => Err(Error::validation(format!(
                "top_k must be an integer between 1 and {max_top_k}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<Match>,
    pub query: String,
    pub total_matches: usize,
}

impl SearchResponse {
    pub fn new(query: String, matches: Vec<Match>) -> Self {
        Self {
            total_matches: matches.len(),
            matches,
            query,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{corpus::CorpusEntry, schema::Experience},
        std::sync::Arc,
    };

    fn entry(person: &str, text: &str, v: Vec<f32>) -> CorpusEntry {
        CorpusEntry {
            person: Arc::from(person),
            experience: Experience::new(text).embedded(v),
        }
    }

    fn jobs_and_rowling() -> Corpus {
        Corpus::from_entries(vec![
            entry("Jobs", "Fired from his own company", vec![1.0, 0.0, 0.0]),
            entry("Rowling", "Rejected by 12 publishers", vec![0.0, 1.0, 0.0]),
        ])
    }

    #[test]
    fn exact_vector_ranks_first_with_similarity_one() {
        let matches = top_k(&jobs_and_rowling(), &[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].person, "Jobs");
        assert_eq!(matches[0].text, "Fired from his own company");
        assert!((matches[0].similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn results_sorted_and_bounded() {
        let corpus = Corpus::from_entries(vec![
            entry("A", "a", vec![0.2, 1.0]),
            entry("B", "b", vec![1.0, 0.1]),
            entry("C", "c", vec![0.7, 0.7]),
            entry("D", "d", vec![-1.0, 0.0]),
        ]);
        let matches = top_k(&corpus, &[1.0, 0.0], 3).unwrap();
        assert_eq!(matches.len(), 3);
        assert!(matches.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        let people: Vec<&str> = matches.iter().map(|m| m.person.as_str()).collect();
        assert_eq!(people, vec!["B", "C", "A"]);

        assert_eq!(top_k(&corpus, &[1.0, 0.0], 50).unwrap().len(), 4);
    }

    #[test]
    fn ties_keep_scan_order() {
        let corpus = Corpus::from_entries(vec![
            entry("First", "x", vec![1.0, 0.0]),
            entry("Second", "y", vec![1.0, 0.0]),
            entry("Other", "w", vec![0.0, 1.0]),
            entry("Third", "z", vec![1.0, 0.0]),
        ]);
        let matches = top_k(&corpus, &[1.0, 0.0], 4).unwrap();
        assert!(matches[..3].iter().all(|m| m.similarity == matches[0].similarity));
        let people: Vec<&str> = matches.iter().map(|m| m.person.as_str()).collect();
        assert_eq!(people, vec!["First", "Second", "Third", "Other"]);
    }

    #[test]
    fn empty_corpus_returns_nothing() {
        assert!(top_k(&Corpus::default(), &[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn query_width_must_match_corpus() {
        let err = top_k(&jobs_and_rowling(), &[1.0, 0.0], 5).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn degenerate_stored_vector_sinks_to_bottom() {
        let corpus = Corpus::from_entries(vec![
            entry("Zero", "z", vec![0.0, 0.0]),
            entry("Away", "a", vec![-1.0, -0.1]),
        ]);
        let matches = top_k(&corpus, &[1.0, 0.0], 2).unwrap();
        assert_eq!(matches[0].person, "Away");
        assert_eq!(matches[1].person, "Zero");
        assert!(!matches[1].similarity.is_nan());
    }

    #[test]
    fn validation_rules() {
        let ok = SearchRequest::new("lost my job", None);
        assert_eq!(ok.validate(DEFAULT_TOP_K, MAX_TOP_K).unwrap(), 5);
        assert_eq!(
            SearchRequest::new("q", Some(50))
                .validate(DEFAULT_TOP_K, MAX_TOP_K)
                .unwrap(),
            50
        );
        for bad in [Some(0), Some(51), Some(-3)] {
            let err = SearchRequest::new("q", bad)
                .validate(DEFAULT_TOP_K, MAX_TOP_K)
                .unwrap_err();
            assert!(err.is_client_error());
        }
        let err = SearchRequest::new("   ", None)
            .validate(DEFAULT_TOP_K, MAX_TOP_K)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn response_omits_absent_source_url() {
        let resp = SearchResponse::new("q".into(), vec![Match {
            person: "Jobs".into(),
            similarity: 0.5,
            keywords: vec!["firing".into()],
            text: "t".into(),
            source_url: None,
        }]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["total_matches"], 1);
        assert!(json["matches"][0].get("source_url").is_none());
    }
}
