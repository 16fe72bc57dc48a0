/// User endpoints: profiles and admin management
///
/// # Endpoints
///
/// - `GET    /v1/users/profile` - Caller's own profile (auth)
/// - `PUT    /v1/users/profile` - Update own profile (auth)
/// - `GET    /v1/users/:id` - Public projection
/// - `PUT    /v1/users/:id` - Update (auth; self or admin)
/// - `DELETE /v1/users/:id` - Delete (auth; self or admin)
/// - `PUT    /v1/users/:id/role` - Change platform role (auth; admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use gatherly_shared::{
    auth::{authorization, middleware::AuthContext, password},
    models::user::{UpdateUser, User, UserRole, UserStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Full profile projection, returned only to the account holder (or admin)
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            avatar_url: user.avatar_url,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Public projection: no email, phone, or account status
#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Profile update request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 512, message = "Avatar URL must be at most 512 characters"))]
    pub avatar_url: Option<String>,

    /// New password, validated for strength before hashing
    pub password: Option<String>,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

async fn apply_profile_update(
    state: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> ApiResult<User> {
    req.validate()?;

    let password_hash = match req.password {
        Some(ref new_password) => {
            password::validate_password_strength(new_password).map_err(|e| {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "password".to_string(),
                    message: e,
                }])
            })?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let user = User::update(
        &state.db,
        user_id,
        UpdateUser {
            name: req.name,
            email: None,
            password_hash,
            phone: req.phone.map(Some),
            avatar_url: req.avatar_url.map(Some),
            status: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(user)
}

/// Get the caller's own profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("Profile retrieved", user.into()))
}

/// Update the caller's own profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    let user = apply_profile_update(&state, auth.user_id, req).await?;

    Ok(ApiResponse::ok("Profile updated", user.into()))
}

/// Get a user's public projection
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<PublicUserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok("User retrieved", user.into()))
}

/// Update a user (self or admin)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    authorization::require_owner_or_admin(&auth, id)?;

    let user = apply_profile_update(&state, id, req).await?;

    Ok(ApiResponse::ok("User updated", user.into()))
}

/// Delete a user (self or admin)
///
/// The user's communities, events, registrations, and comments cascade.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    authorization::require_owner_or_admin(&auth, id)?;

    let deleted = User::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, requester_id = %auth.user_id, "User deleted");

    Ok(ApiResponse::message_only("User deleted"))
}

/// Change a user's platform role (admin only)
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<ProfileResponse>> {
    authorization::require_admin(&auth)?;

    let user = User::update_role(&state.db, id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, role = user.role.as_str(), admin_id = %auth.user_id, "User role changed");

    Ok(ApiResponse::ok("User role updated", user.into()))
}
