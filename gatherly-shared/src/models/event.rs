/// Event model and database operations
///
/// Events belong to a community and an organizer. Coordinates are embedded
/// on the event row; events without coordinates are simply ineligible for
/// the nearby query.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     slug VARCHAR(200) NOT NULL UNIQUE,
///     description TEXT NOT NULL,
///     community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
///     organizer_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ NOT NULL,
///     location_name VARCHAR(200),
///     address VARCHAR(500),
///     latitude DOUBLE PRECISION,
///     longitude DOUBLE PRECISION,
///     capacity INTEGER NOT NULL DEFAULT 0,
///     registration_mode registration_mode NOT NULL DEFAULT 'auto',
///     visibility visibility NOT NULL DEFAULT 'public',
///     status event_status NOT NULL DEFAULT 'upcoming',
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     image_url VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT events_time_order CHECK (end_time >= start_time)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::Visibility;
use crate::geo;

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Not yet published; invisible to registration
    Draft,

    Upcoming,

    Ongoing,

    Completed,

    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

/// How registrations are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_mode", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Registrations are confirmed immediately
    Auto,

    /// Registrations start waitlisted until approved by the organizer
    Manual,
}

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,

    pub title: String,

    /// URL-safe unique identifier
    pub slug: String,

    pub description: String,

    pub community_id: Uuid,

    pub organizer_id: Uuid,

    pub start_time: DateTime<Utc>,

    /// Invariant: `end_time >= start_time`, enforced by a check constraint
    pub end_time: DateTime<Utc>,

    pub location_name: Option<String>,

    pub address: Option<String>,

    /// Latitude in degrees; NULL means no coordinates
    pub latitude: Option<f64>,

    /// Longitude in degrees; always paired with latitude
    pub longitude: Option<f64>,

    /// Maximum attendees; 0 means unlimited
    pub capacity: i32,

    pub registration_mode: RegistrationMode,

    pub visibility: Visibility,

    pub status: EventStatus,

    pub tags: Vec<String>,

    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// The event's coordinates, when both components are present
    pub fn coordinates(&self) -> Option<geo::Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => geo::Coordinates::new(lat, lon),
            _ => None,
        }
    }
}

/// Input for creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEvent {
    pub title: String,

    pub slug: String,

    pub description: String,

    pub community_id: Uuid,

    pub organizer_id: Uuid,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    pub location_name: Option<String>,

    pub address: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    pub capacity: i32,

    pub registration_mode: RegistrationMode,

    pub visibility: Visibility,

    pub status: EventStatus,

    pub tags: Vec<String>,

    pub image_url: Option<String>,
}

/// Input for updating an event; only non-None fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub title: Option<String>,

    pub description: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    pub location_name: Option<Option<String>>,

    pub address: Option<Option<String>>,

    pub latitude: Option<Option<f64>>,

    pub longitude: Option<Option<f64>>,

    pub capacity: Option<i32>,

    pub registration_mode: Option<RegistrationMode>,

    pub visibility: Option<Visibility>,

    pub status: Option<EventStatus>,

    pub tags: Option<Vec<String>>,

    pub image_url: Option<Option<String>>,
}

/// Filter and pagination parameters for event listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    /// Free-text search over title and description
    pub q: Option<String>,

    pub community_id: Option<Uuid>,

    pub status: Option<EventStatus>,

    /// Only events starting at or after this instant
    pub starts_after: Option<DateTime<Utc>>,

    /// Only events starting at or before this instant
    pub starts_before: Option<DateTime<Utc>>,

    /// 1-based page number
    pub page: Option<i64>,

    /// Page size, default 20, capped at 100
    pub per_page: Option<i64>,
}

impl EventFilter {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    /// Effective page size, clamped to 1..=100
    pub fn limit(&self) -> i64 {
        self.per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE)
    }

    /// Effective 1-based page number
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// Appends the filter's WHERE conditions to a query string and returns
    /// the next free bind position.
    fn push_conditions(&self, query: &mut String, mut bind_count: usize) -> usize {
        if self.q.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${n} OR description ILIKE ${n})",
                n = bind_count
            ));
        }
        if self.community_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND community_id = ${}", bind_count));
        }
        if self.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if self.starts_after.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND start_time >= ${}", bind_count));
        }
        if self.starts_before.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND start_time <= ${}", bind_count));
        }
        bind_count
    }
}

const EVENT_COLUMNS: &str = "id, title, slug, description, community_id, organizer_id, \
     start_time, end_time, location_name, address, latitude, longitude, capacity, \
     registration_mode, visibility, status, tags, image_url, created_at, updated_at";

impl Event {
    /// Creates a new event
    ///
    /// The `end_time >= start_time` invariant and slug uniqueness are
    /// enforced by the schema; callers validate richer rules first.
    pub async fn create(pool: &PgPool, data: CreateEvent) -> Result<Self, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, slug, description, community_id, organizer_id,
                                start_time, end_time, location_name, address,
                                latitude, longitude, capacity, registration_mode,
                                visibility, status, tags, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.slug)
        .bind(data.description)
        .bind(data.community_id)
        .bind(data.organizer_id)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.location_name)
        .bind(data.address)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.capacity)
        .bind(data.registration_mode)
        .bind(data.visibility)
        .bind(data.status)
        .bind(data.tags)
        .bind(data.image_url)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    /// Finds an event by ID, `None` when absent
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    /// Finds an event by slug
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    /// Lists events matching the filter, ordered by start time ascending
    ///
    /// Ordering is stabilized with the id as a tiebreaker so pagination
    /// never skips or repeats rows for equal start times.
    pub async fn list(pool: &PgPool, filter: &EventFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE");
        let bind_count = filter.push_conditions(&mut query, 0);
        query.push_str(&format!(
            " ORDER BY start_time ASC, id ASC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut q = sqlx::query_as::<_, Event>(&query);

        if let Some(ref term) = filter.q {
            q = q.bind(format!("%{}%", term));
        }
        if let Some(community_id) = filter.community_id {
            q = q.bind(community_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(starts_after) = filter.starts_after {
            q = q.bind(starts_after);
        }
        if let Some(starts_before) = filter.starts_before {
            q = q.bind(starts_before);
        }

        let events = q
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(pool)
            .await?;

        Ok(events)
    }

    /// Counts events matching the filter (for pagination totals)
    pub async fn count(pool: &PgPool, filter: &EventFilter) -> Result<i64, sqlx::Error> {
        let mut query = String::from("SELECT COUNT(*) FROM events WHERE TRUE");
        filter.push_conditions(&mut query, 0);

        let mut q = sqlx::query_scalar::<_, i64>(&query);

        if let Some(ref term) = filter.q {
            q = q.bind(format!("%{}%", term));
        }
        if let Some(community_id) = filter.community_id {
            q = q.bind(community_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(starts_after) = filter.starts_after {
            q = q.bind(starts_after);
        }
        if let Some(starts_before) = filter.starts_before {
            q = q.bind(starts_before);
        }

        let count = q.fetch_one(pool).await?;

        Ok(count)
    }

    /// Lists a community's events, soonest first
    pub async fn list_by_community(
        pool: &PgPool,
        community_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE community_id = $1
            ORDER BY start_time ASC, id ASC
            "#
        ))
        .bind(community_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Lists events a user holds an active registration for, soonest first
    pub async fn list_registered_by_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT e.id, e.title, e.slug, e.description, e.community_id, e.organizer_id,
                   e.start_time, e.end_time, e.location_name, e.address,
                   e.latitude, e.longitude, e.capacity, e.registration_mode,
                   e.visibility, e.status, e.tags, e.image_url, e.created_at, e.updated_at
            FROM events e
            JOIN registrations r ON r.event_id = e.id
            WHERE r.user_id = $1 AND r.status <> 'cancelled'
            ORDER BY e.start_time ASC, e.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Finds future events within `radius_km` of a point, soonest first
    ///
    /// Fetches future events that carry coordinates, then filters by
    /// great-circle distance in application code. O(n) over future events;
    /// fine at this scale, a bounding-box pre-filter is the upgrade path.
    pub async fn nearby(
        pool: &PgPool,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let candidates = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE start_time > NOW()
              AND latitude IS NOT NULL
              AND status <> 'cancelled'
            ORDER BY start_time ASC, id ASC
            "#
        ))
        .fetch_all(pool)
        .await?;

        let events = candidates
            .into_iter()
            .filter(|e| match (e.latitude, e.longitude) {
                (Some(lat), Some(lon)) => {
                    geo::is_within_radius(latitude, longitude, lat, lon, radius_km)
                }
                _ => false,
            })
            .collect();

        Ok(events)
    }

    /// Updates an event; returns `None` if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateEvent,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE events SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.start_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_time = ${}", bind_count));
        }
        if data.end_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_time = ${}", bind_count));
        }
        if data.location_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", location_name = ${}", bind_count));
        }
        if data.address.is_some() {
            bind_count += 1;
            query.push_str(&format!(", address = ${}", bind_count));
        }
        if data.latitude.is_some() {
            bind_count += 1;
            query.push_str(&format!(", latitude = ${}", bind_count));
        }
        if data.longitude.is_some() {
            bind_count += 1;
            query.push_str(&format!(", longitude = ${}", bind_count));
        }
        if data.capacity.is_some() {
            bind_count += 1;
            query.push_str(&format!(", capacity = ${}", bind_count));
        }
        if data.registration_mode.is_some() {
            bind_count += 1;
            query.push_str(&format!(", registration_mode = ${}", bind_count));
        }
        if data.visibility.is_some() {
            bind_count += 1;
            query.push_str(&format!(", visibility = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.tags.is_some() {
            bind_count += 1;
            query.push_str(&format!(", tags = ${}", bind_count));
        }
        if data.image_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", image_url = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {EVENT_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Event>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(start_time) = data.start_time {
            q = q.bind(start_time);
        }
        if let Some(end_time) = data.end_time {
            q = q.bind(end_time);
        }
        if let Some(location_name) = data.location_name {
            q = q.bind(location_name);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(latitude) = data.latitude {
            q = q.bind(latitude);
        }
        if let Some(longitude) = data.longitude {
            q = q.bind(longitude);
        }
        if let Some(capacity) = data.capacity {
            q = q.bind(capacity);
        }
        if let Some(registration_mode) = data.registration_mode {
            q = q.bind(registration_mode);
        }
        if let Some(visibility) = data.visibility {
            q = q.bind(visibility);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(image_url) = data.image_url {
            q = q.bind(image_url);
        }

        let event = q.fetch_optional(pool).await?;

        Ok(event)
    }

    /// Deletes an event
    ///
    /// Registrations and comments go with it via foreign-key cascades.
    /// Returns true if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
