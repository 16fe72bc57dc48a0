/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an account and get tokens
/// - `POST /v1/auth/login` - Authenticate and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `POST /v1/auth/logout` - Acknowledge logout (requires auth)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
};
use axum::{extract::State, Extension, Json};
use gatherly_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::user::{CreateUser, User, UserStatus},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated for strength before hashing)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional phone number
    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Token pair returned by signup and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn issue_tokens(user: &User, secret: &str) -> Result<TokenResponse, ApiError> {
    let access_claims = jwt::Claims::new(
        user.id,
        user.email.clone(),
        user.role,
        jwt::TokenType::Access,
    );
    let refresh_claims = jwt::Claims::new(
        user.id,
        user.email.clone(),
        user.role,
        jwt::TokenType::Refresh,
    );

    Ok(TokenResponse {
        user_id: user.id.to_string(),
        access_token: jwt::create_token(&access_claims, secret)?,
        refresh_token: jwt::create_token(&refresh_claims, secret)?,
    })
}

/// Signup endpoint
///
/// Creates a new account with the default member role and returns a token
/// pair.
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    if User::email_exists(&state.db, &req.email).await? {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            phone: req.phone,
            avatar_url: None,
        },
    )
    .await?;

    let tokens = issue_tokens(&user, state.jwt_secret())?;

    Ok(ApiResponse::created("Account created", tokens))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden`: Account suspended
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<ApiResponse<TokenResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if user.status == UserStatus::Suspended {
        return Err(ApiError::Forbidden("Account is suspended".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = issue_tokens(&user, state.jwt_secret())?;

    Ok(ApiResponse::ok("Login successful", tokens))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(ApiResponse::ok(
        "Token refreshed",
        RefreshResponse { access_token },
    ))
}

/// Logout endpoint
///
/// Tokens are stateless, so logout is an acknowledgement: clients discard
/// their tokens and the access token ages out on its own.
pub async fn logout(
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<()>> {
    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok(ApiResponse::message_only("Logged out"))
}
