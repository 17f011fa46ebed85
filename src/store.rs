//! Organization metadata store and interaction log accessors.
//!
//! The core's only view of the document store. Organizations are inserted
//! once at ingestion time and never updated in place; interactions are
//! append-only and read newest-first.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::CoreResult;
use crate::models::{IngestionPayload, InteractionRecord, Organization};

/// Page size for the recent-history view.
pub const RECENT_HISTORY_LIMIT: i64 = 50;

pub async fn insert_organization(pool: &SqlitePool, org: &Organization) -> CoreResult<()> {
    let payload_json = serde_json::to_string(&org.payload)?;

    sqlx::query(
        r#"
        INSERT INTO organizations (org_id, name, description, location, mode, payload_json, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&org.org_id)
    .bind(&org.name)
    .bind(&org.description)
    .bind(&org.location)
    .bind(org.payload.mode())
    .bind(&payload_json)
    .bind(org.created_at.timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_organization(pool: &SqlitePool, org_id: &str) -> CoreResult<Option<Organization>> {
    let row = sqlx::query(
        "SELECT org_id, name, description, location, payload_json, created_at FROM organizations WHERE org_id = ?",
    )
    .bind(org_id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_organization).transpose()
}

pub async fn list_organizations(pool: &SqlitePool) -> CoreResult<Vec<Organization>> {
    let rows = sqlx::query(
        "SELECT org_id, name, description, location, payload_json, created_at FROM organizations ORDER BY created_at DESC, org_id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_organization).collect()
}

fn row_to_organization(row: sqlx::sqlite::SqliteRow) -> CoreResult<Organization> {
    let payload_json: String = row.get("payload_json");
    let payload: IngestionPayload = serde_json::from_str(&payload_json)?;
    let created_at: i64 = row.get("created_at");

    Ok(Organization {
        org_id: row.get("org_id"),
        name: row.get("name"),
        description: row.get("description"),
        location: row.get("location"),
        created_at: timestamp_to_datetime(created_at),
        payload,
    })
}

pub async fn append_interaction(pool: &SqlitePool, record: &InteractionRecord) -> CoreResult<()> {
    sqlx::query(
        "INSERT INTO interactions (org_id, question, answer, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&record.org_id)
    .bind(&record.question)
    .bind(&record.answer)
    .bind(record.created_at.timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

/// Recent interactions for one organization, newest first.
pub async fn list_recent_interactions(
    pool: &SqlitePool,
    org_id: &str,
    limit: i64,
) -> CoreResult<Vec<InteractionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT org_id, question, answer, created_at
        FROM interactions
        WHERE org_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(org_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let created_at: i64 = row.get("created_at");
            InteractionRecord {
                org_id: row.get("org_id"),
                question: row.get("question"),
                answer: row.get("answer"),
                created_at: timestamp_to_datetime(created_at),
            }
        })
        .collect())
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}
