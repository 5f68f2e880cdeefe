//! OpenAI-compatible embeddings client for the `/v1/embeddings` endpoint.
//!
//! Works against OpenAI itself and against gateways that speak the same wire format
//! (OpenRouter and friends), which is why the base URL handling is lenient.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    embeddings::EmbeddingProvider,
    error::{Error, Result},
};

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
    dims: usize,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn ends_with_version_segment(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if ends_with_version_segment(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

impl OpenAiEmbeddingProvider {
    /// Build a client from the `[embeddings]` config section.
    pub fn from_config(config: &lifematch_config::EmbeddingsConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            Error::EmbeddingUnavailable(
                "no API key configured (set OPENAI_API_KEY or embeddings.api_key)".into(),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(Error::embedding)?;
        Ok(Self {
            client,
            api_key: Secret::new(api_key.to_string()),
            base_url: normalize_base_url(&config.base_url),
            model: config.model.clone(),
            dims: config.dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Order response rows by their `index` and check count and width.
fn collect_embeddings(
    mut data: Vec<EmbeddingData>,
    expected_count: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected_count {
        return Err(Error::EmbeddingUnavailable(format!(
            "expected {expected_count} embeddings, got {}",
            data.len()
        )));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter()
        .map(|d| {
            if d.embedding.len() == dims {
                Ok(d.embedding)
            } else {
                Err(Error::DimensionMismatch {
                    expected: dims,
                    actual: d.embedding.len(),
                })
            }
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::EmbeddingUnavailable("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let req = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let endpoint = embeddings_endpoint(&self.base_url);
        debug!(%endpoint, model = %self.model, inputs = texts.len(), "requesting embeddings");

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&req)
            .send()
            .await
            .map_err(Error::embedding)?
            .error_for_status()
            .map_err(Error::embedding)?
            .json::<EmbeddingResponse>()
            .await
            .map_err(Error::embedding)?;

        collect_embeddings(resp.data, texts.len(), self.dims)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_host_base_uses_v1_embeddings() {
        assert_eq!(
            embeddings_endpoint("https://api.openai.com/"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn endpoint_from_openrouter_base_appends_embeddings_once() {
        assert_eq!(
            embeddings_endpoint("https://openrouter.ai/api/v1"),
            "https://openrouter.ai/api/v1/embeddings"
        );
    }

    #[test]
    fn endpoint_keeps_explicit_embeddings_url() {
        assert_eq!(
            embeddings_endpoint("https://api.example.com/v4/embeddings"),
            "https://api.example.com/v4/embeddings"
        );
    }

    #[test]
    fn response_rows_are_reordered_by_index() {
        let data = vec![
            EmbeddingData {
                index: Some(1),
                embedding: vec![0.0, 1.0],
            },
            EmbeddingData {
                index: Some(0),
                embedding: vec![1.0, 0.0],
            },
        ];
        let out = collect_embeddings(data, 2, 2).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn short_response_is_unavailable() {
        let data = vec![EmbeddingData {
            index: None,
            embedding: vec![1.0],
        }];
        let err = collect_embeddings(data, 2, 1).unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    }

    #[test]
    fn wrong_width_is_a_dimension_mismatch() {
        let data = vec![EmbeddingData {
            index: Some(0),
            embedding: vec![1.0, 2.0, 3.0],
        }];
        let err = collect_embeddings(data, 1, 1536).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 1536,
                actual: 3
            }
        ));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = lifematch_config::EmbeddingsConfig::default();
        assert!(matches!(
            OpenAiEmbeddingProvider::from_config(&config),
            Err(Error::EmbeddingUnavailable(_))
        ));
    }
}
