//! Schema migrations for the metadata store and interaction log.
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so `knowbot init` can be
//! run repeatedly. Note that the vector indexes themselves are never
//! persisted — only organization metadata and interactions survive a
//! restart.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            org_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL,
            mode TEXT NOT NULL,
            payload_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            org_id TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (org_id) REFERENCES organizations(org_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Serves the newest-first history view
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_interactions_org_time ON interactions(org_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
