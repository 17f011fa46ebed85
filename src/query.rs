//! Retrieval-augmented query engine.
//!
//! Answers a question against one organization's knowledge index:
//! validate, look up the index, embed the question, rank and select the
//! top-k text units, synthesize an answer grounded in them, and record
//! the exchange.
//!
//! Failure ordering matters here: an empty question is rejected before any
//! external call; a missing index is classified (`OrganizationNotFound`
//! vs `IndexUnavailable`) before embedding; a generation failure leaves no
//! interaction record; and a log-append failure after a successful answer
//! is warned, not raised.
//!
//! All answer-synthesis failures surface as `GenerationFailure`, including
//! question-embedding errors: `EmbeddingFailure` is reserved for the index
//! build at ingestion time, and a caller of `answer` sees one failure class
//! for "the answer could not be produced".

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::models::InteractionRecord;
use crate::registry::IndexRegistry;
use crate::{embedding, generate, store};

/// A synthesized answer and the moment it was produced.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// Answer a question against the organization's knowledge index.
pub async fn answer(
    config: &Config,
    pool: &SqlitePool,
    registry: &IndexRegistry,
    org_id: &str,
    question: &str,
) -> CoreResult<Answer> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CoreError::InvalidQuery(
            "question must not be empty".to_string(),
        ));
    }

    let index = match registry.get(org_id) {
        Some(index) => index,
        None => {
            // Known in metadata but not resident means the index was lost
            // (process restart) — an operational condition, not a user error.
            return Err(match store::find_organization(pool, org_id).await? {
                Some(_) => CoreError::IndexUnavailable(org_id.to_string()),
                None => CoreError::OrganizationNotFound(org_id.to_string()),
            });
        }
    };

    let provider = embedding::create_provider(&config.embedding).map_err(as_generation_failure)?;
    let query_vec = embedding::embed_query(provider.as_ref(), &config.embedding, question)
        .await
        .map_err(as_generation_failure)?;

    let hits = index.top_k(&query_vec, config.retrieval.top_k);
    let context: Vec<&str> = hits.iter().map(|(entry, _)| entry.text.as_str()).collect();

    let answer_text = generate::generate_answer(&config.generation, question, &context).await?;
    let created_at = Utc::now();

    let record = InteractionRecord {
        org_id: org_id.to_string(),
        question: question.to_string(),
        answer: answer_text.clone(),
        created_at,
    };
    if let Err(e) = store::append_interaction(pool, &record).await {
        // Best-effort log: the answer is still valid and returnable.
        tracing::warn!(org_id, error = %e, "failed to record interaction");
    }

    Ok(Answer {
        answer: answer_text,
        created_at,
    })
}

/// Query-time embedding errors are part of answer synthesis, not index
/// construction.
fn as_generation_failure(err: CoreError) -> CoreError {
    match err {
        CoreError::EmbeddingFailure(msg) => CoreError::GenerationFailure(msg),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::models::{IngestionPayload, ManualPayload, Organization, ORG_LOCATION};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn disabled_config() -> Config {
        Config {
            db: DbConfig {
                path: ":memory:".into(),
            },
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn empty_question_rejected_before_anything_else() {
        let config = disabled_config();
        let pool = test_pool().await;
        let registry = IndexRegistry::new();

        let err = answer(&config, &pool, &registry, "org1", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn unknown_org_is_not_found() {
        let config = disabled_config();
        let pool = test_pool().await;
        let registry = IndexRegistry::new();

        let err = answer(&config, &pool, &registry, "ghost", "who?")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OrganizationNotFound(_)));
    }

    #[tokio::test]
    async fn metadata_without_index_is_unavailable() {
        // Simulates an organization that survived a restart: metadata
        // present, index not resident.
        let config = disabled_config();
        let pool = test_pool().await;
        let registry = IndexRegistry::new();

        store::insert_organization(
            &pool,
            &Organization {
                org_id: "org1".to_string(),
                name: "Acme".to_string(),
                description: String::new(),
                location: ORG_LOCATION.to_string(),
                created_at: Utc::now(),
                payload: IngestionPayload::Manual(ManualPayload::default()),
            },
        )
        .await
        .unwrap();

        let err = answer(&config, &pool, &registry, "org1", "who?")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn embedding_error_surfaces_as_generation_failure() {
        // With the index resident, a failing embedding provider means the
        // answer could not be synthesized, not that the index is bad.
        let config = disabled_config();
        let pool = test_pool().await;
        let registry = IndexRegistry::new();

        let units = vec![crate::models::TextUnit {
            org_id: "org1".to_string(),
            position: 0,
            text: "Jo is the CEO.".to_string(),
        }];
        let index =
            crate::index::KnowledgeIndex::from_embedded(&units, vec![vec![1.0, 0.0]]).unwrap();
        registry.put("org1", index).unwrap();

        let err = answer(&config, &pool, &registry, "org1", "Who is the CEO?")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::GenerationFailure(_)));
    }
}
