use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A canonical course assignment. The set only grows: rows are created or
/// touched by syncs, never removed, and `source_page_paths` is an
/// append-only set of blob paths.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub content_hash: Option<String>,
    pub source_url: Option<String>,
    pub source_page_paths: Vec<String>,
    pub chosen_due_date_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM assignments WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_ids(ids: &[Uuid], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM assignments WHERE id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Full canonical set of a course, oldest first — the extractor's prior
    /// context.
    pub async fn for_course(course_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM assignments WHERE course_id = $1 ORDER BY created_at ASC",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Insert-or-reuse keyed by `(course_id, title)`. The no-op conflict
    /// update makes the existing row come back, so concurrent syncs of the
    /// same course converge on one row per title.
    pub async fn upsert(
        course_id: Uuid,
        title: &str,
        description: &str,
        content_hash: Option<&str>,
        source_url: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO assignments (course_id, title, description, content_hash, source_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (course_id, title) DO UPDATE SET title = EXCLUDED.title
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(title)
        .bind(description)
        .bind(content_hash)
        .bind(source_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Append a blob path to the assignment's evidence set. A no-op when the
    /// path is already present, so crash-resumes never duplicate entries.
    pub async fn append_source_path(id: Uuid, path: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET source_page_paths = array_append(source_page_paths, $2)
            WHERE id = $1 AND NOT ($2 = ANY(source_page_paths))
            "#,
        )
        .bind(id)
        .bind(path)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Point the assignment at its chosen due date. Called only after the
    /// due_dates row exists.
    pub async fn pin_due_date(id: Uuid, due_date_id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE assignments SET chosen_due_date_id = $2 WHERE id = $1")
            .bind(id)
            .bind(due_date_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
