/// Community endpoints: CRUD and membership
///
/// # Endpoints
///
/// - `GET    /v1/communities` - Public listing, paginated
/// - `GET    /v1/communities/:id` - Lookup by ID
/// - `GET    /v1/communities/:id/events` - A community's events
/// - `GET    /v1/communities/my-communities` - Caller's memberships (auth)
/// - `POST   /v1/communities` - Create (auth; caller becomes Owner)
/// - `PUT    /v1/communities/:id` - Update (auth; creator or admin)
/// - `DELETE /v1/communities/:id` - Delete with cascade (auth; creator or admin)
/// - `POST   /v1/communities/:id/join` - Join or rejoin (auth)
/// - `POST   /v1/communities/:id/leave` - Soft leave (auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{ApiResponse, PageParams, Paginated},
    routes::unique_slug,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use gatherly_shared::{
    auth::{authorization, middleware::AuthContext},
    models::{
        community::{Community, CreateCommunity, UpdateCommunity},
        event::Event,
        membership::{CommunityRole, CreateMembership, Membership},
        Visibility,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create community request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub visibility: Option<Visibility>,
}

/// Update community request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCommunityRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub visibility: Option<Visibility>,
}

/// List public communities, paginated
pub async fn list_communities(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<ApiResponse<Paginated<Community>>> {
    let items = Community::list(&state.db, params.limit(), params.offset()).await?;
    let total = Community::count(&state.db).await?;

    Ok(ApiResponse::ok(
        "Communities retrieved",
        Paginated {
            items,
            page: params.page(),
            per_page: params.limit(),
            total,
        },
    ))
}

/// Get a community by ID
pub async fn get_community(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Community>> {
    let community = Community::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Community not found".to_string()))?;

    Ok(ApiResponse::ok("Community retrieved", community))
}

/// List a community's events, soonest first
pub async fn community_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<Event>>> {
    if Community::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Community not found".to_string()));
    }

    let events = Event::list_by_community(&state.db, id).await?;

    Ok(ApiResponse::ok("Community events retrieved", events))
}

/// List communities the caller is an active member of
pub async fn my_communities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<Community>>> {
    let communities = Community::list_by_member(&state.db, auth.user_id).await?;

    Ok(ApiResponse::ok("Communities retrieved", communities))
}

/// Create a community; the caller becomes its Owner member
pub async fn create_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCommunityRequest>,
) -> ApiResult<ApiResponse<Community>> {
    req.validate()?;

    let community = Community::create(
        &state.db,
        CreateCommunity {
            slug: unique_slug(&req.name),
            name: req.name,
            description: req.description,
            visibility: req.visibility.unwrap_or(Visibility::Public),
            created_by: auth.user_id,
        },
    )
    .await?;

    Membership::create(
        &state.db,
        CreateMembership {
            community_id: community.id,
            user_id: auth.user_id,
            role: CommunityRole::Owner,
        },
    )
    .await?;

    tracing::info!(community_id = %community.id, creator_id = %auth.user_id, "Community created");

    Ok(ApiResponse::created("Community created", community))
}

/// Update a community (creator or admin)
pub async fn update_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCommunityRequest>,
) -> ApiResult<ApiResponse<Community>> {
    req.validate()?;

    let community = Community::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Community not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, community.created_by)?;

    let updated = Community::update(
        &state.db,
        id,
        UpdateCommunity {
            name: req.name,
            description: req.description.map(Some),
            visibility: req.visibility,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Community not found".to_string()))?;

    Ok(ApiResponse::ok("Community updated", updated))
}

/// Delete a community (creator or admin)
///
/// Events, their registrations and comments, and memberships all go with it.
pub async fn delete_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let community = Community::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Community not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, community.created_by)?;

    Community::delete(&state.db, id).await?;

    tracing::info!(community_id = %id, requester_id = %auth.user_id, "Community deleted");

    Ok(ApiResponse::message_only("Community deleted"))
}

/// Join a community as a regular member
///
/// Rejoining after a leave reactivates the membership.
pub async fn join_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Membership>> {
    if Community::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Community not found".to_string()));
    }

    let membership = Membership::create(
        &state.db,
        CreateMembership {
            community_id: id,
            user_id: auth.user_id,
            role: CommunityRole::Member,
        },
    )
    .await?;

    Ok(ApiResponse::ok("Joined community", membership))
}

/// Leave a community
///
/// Not being a member is a negative result, not an error.
pub async fn leave_community(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Membership>> {
    match Membership::leave(&state.db, id, auth.user_id).await? {
        Some(membership) => Ok(ApiResponse::ok("Left community", membership)),
        None => Ok(ApiResponse::message_only("No active membership")),
    }
}
