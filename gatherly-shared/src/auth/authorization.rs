/// Authorization checks
///
/// One predicate covers every mutating endpoint: the requester may modify a
/// resource iff they own it or hold the platform admin role. Comments are
/// the exception (author-only, no admin bypass) and use
/// [`require_author`] instead.
///
/// # Example
///
/// ```
/// use gatherly_shared::auth::authorization::can_modify;
/// use gatherly_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let stranger = Uuid::new_v4();
///
/// assert!(can_modify(owner, owner, UserRole::Member));
/// assert!(can_modify(owner, stranger, UserRole::Admin));
/// assert!(!can_modify(owner, stranger, UserRole::Member));
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::membership::{CommunityRole, Membership};
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Requester is neither the resource owner nor an admin
    #[error("Not authorized to modify this resource")]
    NotOwner,

    /// Action requires the admin role
    #[error("Admin role required")]
    AdminRequired,

    /// Requester is not a member of the community
    #[error("Not a member of community {0}")]
    NotMember(Uuid),

    /// Requester's community role is insufficient
    #[error("Insufficient community role: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: CommunityRole,
        actual: CommunityRole,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The central modification predicate
///
/// True iff the requester owns the resource or holds the admin role.
pub fn can_modify(resource_owner_id: Uuid, requester_id: Uuid, requester_role: UserRole) -> bool {
    requester_id == resource_owner_id || requester_role.is_admin()
}

/// Requires the requester to own the resource or be an admin
pub fn require_owner_or_admin(auth: &AuthContext, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if can_modify(resource_owner_id, auth.user_id, auth.role) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Requires the requester to be the resource's author, with no admin bypass
///
/// Used for comments: moderation goes through the hide flag, not edits.
pub fn require_author(auth: &AuthContext, author_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == author_id {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Requires the platform admin role
pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Requires an active community membership with at least the given role
///
/// Platform admins pass without a membership.
pub async fn require_community_role(
    pool: &PgPool,
    auth: &AuthContext,
    community_id: Uuid,
    required: CommunityRole,
) -> Result<(), AuthzError> {
    if auth.is_admin() {
        return Ok(());
    }

    let role = Membership::get_role(pool, community_id, auth.user_id)
        .await?
        .ok_or(AuthzError::NotMember(community_id))?;

    if !role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: role,
        });
    }

    Ok(())
}
