//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — refuses all work; used when no provider is
//!   configured.
//! - **[`OpenAIProvider`]** — calls the OpenAI embeddings API with retry
//!   and backoff.
//!
//! The provider contract: an explicit error, never a malformed vector.
//! Responses are validated here (count, dimensionality, finite components)
//! before any caller sees them.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{CoreError, CoreResult};

/// Trait for embedding providers.
///
/// The actual embedding computation is performed by [`embed_texts`]
/// (kept as a free function due to async trait limitations).
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
}

/// Embed a batch of texts using the configured provider.
///
/// Returns one vector per input text, in input order. Every vector is
/// validated against the provider's dimensionality and checked for
/// NaN/Inf components.
///
/// # Errors
///
/// [`CoreError::EmbeddingFailure`] when the provider is disabled or
/// unknown, the API fails after retries, or the response is ill-formed.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> CoreResult<Vec<Vec<f32>>> {
    let vectors = match config.provider.as_str() {
        "openai" => embed_openai(config, texts).await?,
        "disabled" => {
            return Err(CoreError::EmbeddingFailure(
                "embedding provider is disabled".to_string(),
            ))
        }
        other => {
            return Err(CoreError::EmbeddingFailure(format!(
                "unknown embedding provider: {}",
                other
            )))
        }
    };

    validate_vectors(provider.dims(), texts.len(), &vectors)?;
    Ok(vectors)
}

/// Embed a single query text.
///
/// Convenience wrapper around [`embed_texts`] for the question-embedding
/// side of retrieval.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    text: &str,
) -> CoreResult<Vec<f32>> {
    let results = embed_texts(provider, config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::EmbeddingFailure("empty embedding response".to_string()))
}

/// Reject ill-formed provider output: wrong count, wrong dimensionality,
/// or non-finite components.
fn validate_vectors(dims: usize, expected: usize, vectors: &[Vec<f32>]) -> CoreResult<()> {
    if vectors.len() != expected {
        return Err(CoreError::EmbeddingFailure(format!(
            "expected {} vectors, got {}",
            expected,
            vectors.len()
        )));
    }
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dims {
            return Err(CoreError::EmbeddingFailure(format!(
                "vector {} has {} dimensions, expected {}",
                i,
                vector.len(),
                dims
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::EmbeddingFailure(format!(
                "vector {} contains non-finite components",
                i
            )));
        }
    }
    Ok(())
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledProvider;

impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> CoreResult<Self> {
        let model = config.model.clone().ok_or_else(|| {
            CoreError::EmbeddingFailure("embedding.model required for OpenAI provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            CoreError::EmbeddingFailure("embedding.dims required for OpenAI provider".to_string())
        })?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(CoreError::EmbeddingFailure(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }

        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

/// Call the OpenAI embeddings API with retry/backoff.
async fn embed_openai(config: &EmbeddingConfig, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| CoreError::EmbeddingFailure("OPENAI_API_KEY not set".to_string()))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| CoreError::EmbeddingFailure("embedding.model required".to_string()))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CoreError::EmbeddingFailure(e.to_string()))?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });
    let url = format!("{}/v1/embeddings", config.base_url.trim_end_matches('/'));

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response
                        .json()
                        .await
                        .map_err(|e| CoreError::EmbeddingFailure(e.to_string()))?;
                    return parse_openai_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(format!("OpenAI API error {}: {}", status, body_text));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                return Err(CoreError::EmbeddingFailure(format!(
                    "OpenAI API error {}: {}",
                    status, body_text
                )));
            }
            Err(e) => {
                last_err = Some(e.to_string());
                continue;
            }
        }
    }

    Err(CoreError::EmbeddingFailure(
        last_err.unwrap_or_else(|| "embedding failed after retries".to_string()),
    ))
}

/// Parse the OpenAI embeddings API response JSON, in input order.
fn parse_openai_response(json: &serde_json::Value) -> CoreResult<Vec<Vec<f32>>> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        CoreError::EmbeddingFailure("invalid OpenAI response: missing data array".to_string())
    })?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                CoreError::EmbeddingFailure("invalid OpenAI response: missing embedding".to_string())
            })?;

        let mut vec = Vec::with_capacity(embedding.len());
        for component in embedding {
            let n = component.as_f64().ok_or_else(|| {
                CoreError::EmbeddingFailure(
                    "invalid OpenAI response: non-numeric embedding component".to_string(),
                )
            })?;
            vec.push(n as f32);
        }

        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> CoreResult<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        other => Err(CoreError::EmbeddingFailure(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_refuses_embedding() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "disabled");

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt
            .block_on(embed_texts(
                provider.as_ref(),
                &config,
                &["hello".to_string()],
            ))
            .unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn validate_rejects_wrong_count() {
        let err = validate_vectors(3, 2, &[vec![0.0, 0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn validate_rejects_wrong_dims() {
        let err = validate_vectors(3, 1, &[vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn validate_rejects_nan() {
        let err = validate_vectors(2, 1, &[vec![0.5, f32::NAN]]).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn validate_accepts_well_formed() {
        assert!(validate_vectors(2, 2, &[vec![0.5, 1.0], vec![-1.0, 0.0]]).is_ok());
    }

    #[test]
    fn parse_rejects_non_numeric_component() {
        let json = serde_json::json!({
            "data": [ { "embedding": [0.1, "oops", 0.3] } ]
        });
        let err = parse_openai_response(&json).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn parse_response_extracts_vectors_in_order() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.1, 0.2] },
                { "embedding": [0.3, 0.4] },
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert!((vecs[0][0] - 0.1).abs() < 1e-6);
        assert!((vecs[1][1] - 0.4).abs() < 1e-6);
    }
}
