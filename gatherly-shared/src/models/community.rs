/// Community model and database operations
///
/// Communities group events and members. Each community has a unique slug
/// for stable URLs and a creator who holds the Owner membership role.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE communities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL,
///     slug VARCHAR(200) NOT NULL UNIQUE,
///     description TEXT,
///     visibility visibility NOT NULL DEFAULT 'public',
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Visibility;

/// Community record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Community {
    pub id: Uuid,

    pub name: String,

    /// URL-safe unique identifier
    pub slug: String,

    pub description: Option<String>,

    pub visibility: Visibility,

    /// Creator; holds the Owner membership
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a community
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommunity {
    pub name: String,

    pub slug: String,

    pub description: Option<String>,

    pub visibility: Visibility,

    pub created_by: Uuid,
}

/// Input for updating a community; only non-None fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCommunity {
    pub name: Option<String>,

    pub description: Option<Option<String>>,

    pub visibility: Option<Visibility>,
}

impl Community {
    /// Creates a new community
    ///
    /// Fails with a unique-constraint violation if the slug is taken.
    pub async fn create(pool: &PgPool, data: CreateCommunity) -> Result<Self, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            INSERT INTO communities (name, slug, description, visibility, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, slug, description, visibility, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.slug)
        .bind(data.description)
        .bind(data.visibility)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(community)
    }

    /// Finds a community by ID, `None` when absent
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, slug, description, visibility, created_by,
                   created_at, updated_at
            FROM communities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(community)
    }

    /// Finds a community by slug
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, slug, description, visibility, created_by,
                   created_at, updated_at
            FROM communities
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(community)
    }

    /// Lists public communities with pagination, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let communities = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, slug, description, visibility, created_by,
                   created_at, updated_at
            FROM communities
            WHERE visibility = 'public'
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(communities)
    }

    /// Counts public communities
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM communities WHERE visibility = 'public'")
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Lists communities the user is an active member of
    pub async fn list_by_member(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let communities = sqlx::query_as::<_, Community>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.visibility, c.created_by,
                   c.created_at, c.updated_at
            FROM communities c
            JOIN memberships m ON m.community_id = c.id
            WHERE m.user_id = $1 AND m.left_at IS NULL
            ORDER BY m.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(communities)
    }

    /// Updates a community; returns `None` if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCommunity,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE communities SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.visibility.is_some() {
            bind_count += 1;
            query.push_str(&format!(", visibility = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, name, slug, description, visibility, created_by, \
             created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Community>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(visibility) = data.visibility {
            q = q.bind(visibility);
        }

        let community = q.fetch_optional(pool).await?;

        Ok(community)
    }

    /// Deletes a community
    ///
    /// Cascades to its events (and transitively their registrations and
    /// comments) and memberships. Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM communities WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_community_default() {
        let update = UpdateCommunity::default();
        assert!(update.name.is_none());
        assert!(update.description.is_none());
        assert!(update.visibility.is_none());
    }
}
