/// Comment model and database operations
///
/// Comments thread via an optional parent reference. A reply's parent must
/// already exist on the same event, so parent chains cannot form cycles.
/// Deleting a parent removes its replies through the foreign-key cascade.
/// Hidden comments stay in the table but drop out of event listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    pub event_id: Uuid,

    pub author_id: Uuid,

    /// Parent comment for threaded replies
    pub parent_id: Option<Uuid>,

    pub content: String,

    /// Moderation flag; hidden comments are excluded from event listings
    pub hidden: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub event_id: Uuid,

    pub author_id: Uuid,

    pub parent_id: Option<Uuid>,

    pub content: String,
}

/// Error type for comment creation
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    /// Referenced parent comment doesn't exist or belongs to another event
    #[error("Parent comment {0} not found on this event")]
    InvalidParent(Uuid),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const COMMENT_COLUMNS: &str =
    "id, event_id, author_id, parent_id, content, hidden, created_at, updated_at";

impl Comment {
    /// Creates a comment
    ///
    /// When `parent_id` is given, the parent must exist on the same event;
    /// otherwise [`CommentError::InvalidParent`] is returned.
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, CommentError> {
        if let Some(parent_id) = data.parent_id {
            let parent_ok: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1 AND event_id = $2)",
            )
            .bind(parent_id)
            .bind(data.event_id)
            .fetch_one(pool)
            .await?;

            if !parent_ok {
                return Err(CommentError::InvalidParent(parent_id));
            }
        }

        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (event_id, author_id, parent_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(data.event_id)
        .bind(data.author_id)
        .bind(data.parent_id)
        .bind(data.content)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Finds a comment by ID, `None` when absent
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Lists an event's visible comments, oldest first
    pub async fn list_by_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE event_id = $1 AND NOT hidden
            ORDER BY created_at, id
            "#
        ))
        .bind(event_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Rewrites a comment's content; returns `None` if it doesn't exist
    pub async fn update_content(
        pool: &PgPool,
        id: Uuid,
        content: String,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Sets the moderation flag; returns `None` if the comment doesn't exist
    pub async fn set_hidden(
        pool: &PgPool,
        id: Uuid,
        hidden: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            UPDATE comments
            SET hidden = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(hidden)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Deletes a comment and, via cascade, its replies
    ///
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
