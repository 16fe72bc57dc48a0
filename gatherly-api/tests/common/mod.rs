/// Common test utilities for integration tests
///
/// Provides shared infrastructure:
/// - Test database setup (connects via DATABASE_URL, runs migrations)
/// - Test user creation with JWT tokens
/// - Fixture helpers for communities and events
/// - Response body helpers

use chrono::{Duration, Utc};
use gatherly_api::app::{build_router, AppState};
use gatherly_api::config::Config;
use gatherly_shared::auth::jwt::{create_token, Claims, TokenType};
use gatherly_shared::models::community::{Community, CreateCommunity};
use gatherly_shared::models::event::{CreateEvent, Event, EventStatus, RegistrationMode};
use gatherly_shared::models::membership::{CommunityRole, CreateMembership, Membership};
use gatherly_shared::models::user::{CreateUser, User, UserRole};
use gatherly_shared::models::Visibility;
use sqlx::PgPool;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub jwt_token: String,
}

impl TestContext {
    /// Creates a new test context against the database from DATABASE_URL
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Migrations live in the shared crate
        sqlx::migrate!("../gatherly-shared/migrations").run(&db).await?;

        let (user, jwt_token) = create_user(&db, &config.jwt.secret, UserRole::Member).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            user,
            jwt_token,
        })
    }

    /// Returns the default user's authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Creates an extra user with the given role and returns it with a token
    pub async fn other_user(&self, role: UserRole) -> anyhow::Result<(User, String)> {
        create_user(&self.db, &self.config.jwt.secret, role).await
    }
}

/// Creates a user with a unique email and an access token for them
pub async fn create_user(
    db: &PgPool,
    jwt_secret: &str,
    role: UserRole,
) -> anyhow::Result<(User, String)> {
    let user = User::create(
        db,
        CreateUser {
            name: "Test User".to_string(),
            email: format!("test-{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$test-not-a-real-hash".to_string(),
            phone: None,
            avatar_url: None,
        },
    )
    .await?;

    let user = match role {
        UserRole::Member => user,
        other => User::update_role(db, user.id, other)
            .await?
            .expect("user just created"),
    };

    let claims = Claims::new(user.id, user.email.clone(), user.role, TokenType::Access);
    let token = create_token(&claims, jwt_secret)?;

    Ok((user, token))
}

/// Creates a community owned by the given user
pub async fn create_test_community(db: &PgPool, creator_id: Uuid) -> anyhow::Result<Community> {
    let community = Community::create(
        db,
        CreateCommunity {
            name: "Test Community".to_string(),
            slug: format!("test-community-{}", Uuid::new_v4().simple()),
            description: Some("A community for tests".to_string()),
            visibility: Visibility::Public,
            created_by: creator_id,
        },
    )
    .await?;

    Membership::create(
        db,
        CreateMembership {
            community_id: community.id,
            user_id: creator_id,
            role: CommunityRole::Owner,
        },
    )
    .await?;

    Ok(community)
}

/// Options for test event creation
pub struct TestEvent {
    pub capacity: i32,
    pub registration_mode: RegistrationMode,
    pub coordinates: Option<(f64, f64)>,
}

impl Default for TestEvent {
    fn default() -> Self {
        Self {
            capacity: 0,
            registration_mode: RegistrationMode::Auto,
            coordinates: None,
        }
    }
}

/// Creates an upcoming event one week out
pub async fn create_test_event(
    db: &PgPool,
    community_id: Uuid,
    organizer_id: Uuid,
    options: TestEvent,
) -> anyhow::Result<Event> {
    let start = Utc::now() + Duration::days(7);

    let event = Event::create(
        db,
        CreateEvent {
            title: "Test Event".to_string(),
            slug: format!("test-event-{}", Uuid::new_v4().simple()),
            description: "An event for tests".to_string(),
            community_id,
            organizer_id,
            start_time: start,
            end_time: start + Duration::hours(2),
            location_name: None,
            address: None,
            latitude: options.coordinates.map(|c| c.0),
            longitude: options.coordinates.map(|c| c.1),
            capacity: options.capacity,
            registration_mode: options.registration_mode,
            visibility: Visibility::Public,
            status: EventStatus::Upcoming,
            tags: vec![],
            image_url: None,
        },
    )
    .await?;

    Ok(event)
}

/// Reads a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&body).expect("body should be JSON")
}
