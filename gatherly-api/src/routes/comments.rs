/// Comment endpoints: CRUD and moderation
///
/// Update and delete are author-only with no admin bypass; moderation goes
/// through the hide flag instead of edits.
///
/// # Endpoints
///
/// - `GET    /v1/comments/event/:event_id` - Visible comments on an event
/// - `GET    /v1/comments/:id` - Lookup by ID
/// - `POST   /v1/comments` - Create (auth)
/// - `PUT    /v1/comments/:id` - Update (auth; author only)
/// - `DELETE /v1/comments/:id` - Delete, cascades to replies (auth; author only)
/// - `POST   /v1/comments/:id/hide` - Hide or unhide (auth; admin only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use gatherly_shared::{
    auth::{authorization, middleware::AuthContext},
    models::{
        comment::{Comment, CreateComment},
        event::Event,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    pub event_id: Uuid,

    /// Parent comment for a threaded reply
    pub parent_id: Option<Uuid>,

    #[validate(length(min = 1, max = 1000, message = "Content must be 1-1000 characters"))]
    pub content: String,
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Content must be 1-1000 characters"))]
    pub content: String,
}

/// Hide/unhide request
#[derive(Debug, Deserialize)]
pub struct HideCommentRequest {
    /// Defaults to hiding; pass false to unhide
    #[serde(default = "default_hidden")]
    pub hidden: bool,
}

fn default_hidden() -> bool {
    true
}

/// List an event's visible comments, oldest first
///
/// An unknown event id yields an empty list, matching the cascade
/// semantics after an event is deleted.
pub async fn comments_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<Comment>>> {
    let comments = Comment::list_by_event(&state.db, event_id).await?;

    Ok(ApiResponse::ok("Comments retrieved", comments))
}

/// Get a comment by ID
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Comment>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::ok("Comment retrieved", comment))
}

/// Create a comment on an event
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<ApiResponse<Comment>> {
    req.validate()?;

    if Event::find_by_id(&state.db, req.event_id).await?.is_none() {
        return Err(ApiError::NotFound("Event not found".to_string()));
    }

    let comment = Comment::create(
        &state.db,
        CreateComment {
            event_id: req.event_id,
            author_id: auth.user_id,
            parent_id: req.parent_id,
            content: req.content,
        },
    )
    .await?;

    Ok(ApiResponse::created("Comment created", comment))
}

/// Update a comment's content (author only)
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> ApiResult<ApiResponse<Comment>> {
    req.validate()?;

    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    authorization::require_author(&auth, comment.author_id)?;

    let updated = Comment::update_content(&state.db, id, req.content)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(ApiResponse::ok("Comment updated", updated))
}

/// Delete a comment and its replies (author only)
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let comment = Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    authorization::require_author(&auth, comment.author_id)?;

    Comment::delete(&state.db, id).await?;

    Ok(ApiResponse::message_only("Comment deleted"))
}

/// Hide or unhide a comment (admin only)
pub async fn hide_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<HideCommentRequest>,
) -> ApiResult<ApiResponse<Comment>> {
    authorization::require_admin(&auth)?;

    let comment = Comment::set_hidden(&state.db, id, req.hidden)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    tracing::info!(comment_id = %id, hidden = req.hidden, moderator_id = %auth.user_id, "Comment moderated");

    Ok(ApiResponse::ok(
        if req.hidden { "Comment hidden" } else { "Comment unhidden" },
        comment,
    ))
}
