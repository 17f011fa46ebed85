//! Ingestion orchestration.
//!
//! Coordinates the full registration flow for one organization:
//! normalize → embed+build index → register → persist metadata. All-or-
//! nothing: a failure at any step leaves no index registered and no
//! metadata persisted. Ids are random UUIDs, so concurrently created
//! organizations never collide and registry `put` never races an existing
//! key during normal operation.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index;
use crate::models::{
    AutomaticPayload, IngestSource, IngestionPayload, Organization, ORG_LOCATION,
};
use crate::normalize;
use crate::registry::IndexRegistry;
use crate::{embedding, store};

/// A create-organization request.
#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub description: String,
    pub source: IngestSource,
}

/// Register a new organization: build and cache its knowledge index, then
/// persist its metadata.
///
/// # Errors
///
/// Propagates [`crate::error::CoreError`] from every stage: `InvalidInput`
/// / `UnsupportedDocument` from normalization, `EmbeddingFailure` from the
/// index build, `AlreadyIndexed` from registration, `Store` from
/// persistence. On error nothing remains registered or persisted.
pub async fn create_organization(
    config: &Config,
    pool: &SqlitePool,
    registry: &IndexRegistry,
    request: CreateOrganization,
) -> CoreResult<Organization> {
    if request.name.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "organization name is required".to_string(),
        ));
    }

    let org_id = Uuid::new_v4().to_string();

    let units = normalize::normalize(&org_id, &request.name, &request.source)?;

    let provider = embedding::create_provider(&config.embedding)?;
    let knowledge = index::build_index(provider.as_ref(), &config.embedding, &units).await?;
    let unit_count = knowledge.len();

    let payload = match request.source {
        IngestSource::Automatic { filename, .. } => IngestionPayload::Automatic(AutomaticPayload {
            source_filename: filename,
            page_count: unit_count,
        }),
        IngestSource::Manual(manual) => IngestionPayload::Manual(manual),
    };

    let org = Organization {
        org_id: org_id.clone(),
        name: request.name.trim().to_string(),
        description: request.description,
        location: ORG_LOCATION.to_string(),
        created_at: Utc::now(),
        payload,
    };

    registry.put(&org_id, knowledge)?;

    if let Err(e) = store::insert_organization(pool, &org).await {
        // Roll back the registration so a failed ingestion leaves nothing
        // resident; the id was never revealed to the caller.
        registry.remove(&org_id);
        tracing::warn!(org_id = %org_id, error = %e, "metadata persist failed, index registration rolled back");
        return Err(e);
    }

    tracing::info!(
        org_id = %org.org_id,
        name = %org.name,
        mode = org.payload.mode(),
        units = unit_count,
        "organization registered"
    );

    Ok(org)
}
