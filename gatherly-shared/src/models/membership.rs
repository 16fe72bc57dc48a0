/// Membership model and database operations
///
/// Memberships link users to communities with a role. Leaving is a soft
/// operation (`left_at` timestamp) so rejoin history survives; all queries
/// that matter treat `left_at IS NULL` as "active".
///
/// # Schema
///
/// ```sql
/// CREATE TYPE community_role AS ENUM ('owner', 'moderator', 'member');
///
/// CREATE TABLE memberships (
///     community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role community_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     left_at TIMESTAMPTZ,
///     PRIMARY KEY (community_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role within a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "community_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommunityRole {
    /// Community creator; full control
    Owner,

    /// Can curate events and members
    Moderator,

    /// Regular participant
    Member,
}

impl CommunityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityRole::Owner => "owner",
            CommunityRole::Moderator => "moderator",
            CommunityRole::Member => "member",
        }
    }

    /// Checks if this role is at least the required role
    ///
    /// Hierarchy: Owner > Moderator > Member
    pub fn has_permission(&self, required: &CommunityRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            CommunityRole::Owner => 3,
            CommunityRole::Moderator => 2,
            CommunityRole::Member => 1,
        }
    }
}

/// Membership record linking a user to a community
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub community_id: Uuid,

    pub user_id: Uuid,

    pub role: CommunityRole,

    pub joined_at: DateTime<Utc>,

    /// Set when the user leaves; NULL means active
    pub left_at: Option<DateTime<Utc>>,
}

/// Input for creating a membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub community_id: Uuid,

    pub user_id: Uuid,

    pub role: CommunityRole,
}

impl Membership {
    /// Adds a user to a community, reactivating a previously left membership
    ///
    /// Rejoining resets `joined_at` and clears `left_at` but keeps the
    /// original role.
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (community_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (community_id, user_id)
                DO UPDATE SET left_at = NULL, joined_at = NOW()
            RETURNING community_id, user_id, role, joined_at, left_at
            "#,
        )
        .bind(data.community_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Marks a membership as left
    ///
    /// Returns the updated membership, or `None` if the user has no active
    /// membership in the community.
    pub async fn leave(
        pool: &PgPool,
        community_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET left_at = NOW()
            WHERE community_id = $1 AND user_id = $2 AND left_at IS NULL
            RETURNING community_id, user_id, role, joined_at, left_at
            "#,
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Gets a user's active role in a community, `None` when not a member
    pub async fn get_role(
        pool: &PgPool,
        community_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CommunityRole>, sqlx::Error> {
        let role: Option<CommunityRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM memberships
            WHERE community_id = $1 AND user_id = $2 AND left_at IS NULL
            "#,
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Checks whether a user is an active member of a community
    pub async fn is_member(
        pool: &PgPool,
        community_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM memberships
                WHERE community_id = $1 AND user_id = $2 AND left_at IS NULL
            )
            "#,
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists a user's active memberships, most recent first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT community_id, user_id, role, joined_at, left_at
            FROM memberships
            WHERE user_id = $1 AND left_at IS NULL
            ORDER BY joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Lists active members of a community, oldest first
    pub async fn list_by_community(
        pool: &PgPool,
        community_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT community_id, user_id, role, joined_at, left_at
            FROM memberships
            WHERE community_id = $1 AND left_at IS NULL
            ORDER BY joined_at
            "#,
        )
        .bind(community_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }
}
