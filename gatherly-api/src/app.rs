/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gatherly_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use gatherly_shared::auth::{jwt, middleware::AuthContext};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Uses Arc
/// internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/                             # API v1 (versioned)
///     ├── /auth/                       # signup, login, refresh, logout
///     ├── /events/                     # lifecycle + registration + nearby
///     ├── /communities/                # CRUD + membership
///     ├── /comments/                   # CRUD + moderation
///     └── /users/                      # profile + admin
/// ```
///
/// Per resource, public read routes and authenticated mutation routes are
/// kept in separate sub-routers; only the latter carry the JWT layer.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth: signup/login/refresh are public, logout needs a valid token
    let auth_public = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let auth_protected = Router::new()
        .route("/logout", post(routes::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Events: listings and lookups are public, mutations authenticated
    let events_public = Router::new()
        .route("/", get(routes::events::list_events))
        .route("/nearby", get(routes::events::nearby_events))
        .route("/:id", get(routes::events::get_event));

    let events_protected = Router::new()
        .route("/", post(routes::events::create_event))
        .route("/my-events", get(routes::events::my_events))
        .route("/:id", put(routes::events::update_event))
        .route("/:id", delete(routes::events::delete_event))
        .route("/:id/register", post(routes::events::register))
        .route("/:id/unregister", post(routes::events::unregister))
        .route("/:id/registrations", get(routes::events::list_registrations))
        .route(
            "/:id/registrations/:user_id/check-in",
            post(routes::events::check_in),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Communities
    let communities_public = Router::new()
        .route("/", get(routes::communities::list_communities))
        .route("/:id", get(routes::communities::get_community))
        .route("/:id/events", get(routes::communities::community_events));

    let communities_protected = Router::new()
        .route("/", post(routes::communities::create_community))
        .route(
            "/my-communities",
            get(routes::communities::my_communities),
        )
        .route("/:id", put(routes::communities::update_community))
        .route("/:id", delete(routes::communities::delete_community))
        .route("/:id/join", post(routes::communities::join_community))
        .route("/:id/leave", post(routes::communities::leave_community))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Comments
    let comments_public = Router::new()
        .route("/event/:event_id", get(routes::comments::comments_by_event))
        .route("/:id", get(routes::comments::get_comment));

    let comments_protected = Router::new()
        .route("/", post(routes::comments::create_comment))
        .route("/:id", put(routes::comments::update_comment))
        .route("/:id", delete(routes::comments::delete_comment))
        .route("/:id/hide", post(routes::comments::hide_comment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Users
    let users_public = Router::new().route("/:id", get(routes::users::get_user));

    let users_protected = Router::new()
        .route("/profile", get(routes::users::get_profile))
        .route("/profile", put(routes::users::update_profile))
        .route("/:id", put(routes::users::update_user))
        .route("/:id", delete(routes::users::delete_user))
        .route("/:id/role", put(routes::users::update_user_role))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .nest("/events", events_public.merge(events_protected))
        .nest(
            "/communities",
            communities_public.merge(communities_protected),
        )
        .nest("/comments", comments_public.merge(comments_protected))
        .nest("/users", users_public.merge(users_protected));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects an [`AuthContext`] into request extensions. Any missing or
/// invalid identity is rejected here, before the handler runs.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::Unauthorized("Expected Bearer token".to_string())
    })?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}
