/// Event endpoints: lifecycle, registration workflow, nearby filter
///
/// # Endpoints
///
/// - `GET    /v1/events` - List with filters and pagination
/// - `GET    /v1/events/nearby` - Future events within a radius of a point
/// - `GET    /v1/events/:id` - Lookup by ID
/// - `GET    /v1/events/my-events` - Events the caller is registered for (auth)
/// - `POST   /v1/events` - Create (auth; organizer = caller)
/// - `PUT    /v1/events/:id` - Update (auth; organizer or admin)
/// - `DELETE /v1/events/:id` - Delete with cascade (auth; organizer or admin)
/// - `POST   /v1/events/:id/register` - Register the caller (auth)
/// - `POST   /v1/events/:id/unregister` - Cancel the caller's registration (auth)
/// - `GET    /v1/events/:id/registrations` - Attendee list (auth; organizer or admin)
/// - `POST   /v1/events/:id/registrations/:user_id/check-in` - Check in an
///   attendee (auth; organizer or admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::{ApiResponse, Paginated},
    routes::unique_slug,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use gatherly_shared::{
    auth::{authorization, middleware::AuthContext},
    geo,
    models::{
        community::Community,
        event::{CreateEvent, Event, EventFilter, EventStatus, RegistrationMode, UpdateEvent},
        registration::Registration,
        Visibility,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create event request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,

    pub community_id: Uuid,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(length(max = 200, message = "Location name must be at most 200 characters"))]
    pub location_name: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    /// Maximum attendees; 0 (the default) means unlimited
    #[serde(default)]
    #[validate(range(min = 0, message = "Capacity must be non-negative"))]
    pub capacity: i32,

    /// Defaults to auto (registrations confirmed immediately)
    pub registration_mode: Option<RegistrationMode>,

    pub visibility: Option<Visibility>,

    /// Initial status; only draft or upcoming are accepted at creation
    pub status: Option<EventStatus>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub image_url: Option<String>,
}

/// Update event request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    #[validate(length(max = 200, message = "Location name must be at most 200 characters"))]
    pub location_name: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    #[validate(range(min = 0, message = "Capacity must be non-negative"))]
    pub capacity: Option<i32>,

    pub registration_mode: Option<RegistrationMode>,

    pub visibility: Option<Visibility>,

    pub status: Option<EventStatus>,

    pub tags: Option<Vec<String>>,

    pub image_url: Option<String>,
}

/// Nearby query parameters
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,

    pub longitude: f64,

    /// Search radius in kilometers (default: 10)
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    10.0
}

/// Event projection with its attending count
#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,

    /// Attendees currently occupying capacity slots
    pub attending: i64,
}

fn validation_error(field: &str, message: &str) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message: message.to_string(),
    }])
}

/// Validates an optional coordinate pair, requiring both or neither
fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ApiError> {
    match (latitude, longitude) {
        (None, None) => Ok(()),
        (Some(lat), Some(lon)) => {
            geo::Coordinates::new(lat, lon)
                .map(|_| ())
                .ok_or_else(|| validation_error("latitude", "Coordinates out of range"))
        }
        _ => Err(validation_error(
            "latitude",
            "Latitude and longitude must be provided together",
        )),
    }
}

/// List events with optional filters and pagination
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> ApiResult<ApiResponse<Paginated<Event>>> {
    let items = Event::list(&state.db, &filter).await?;
    let total = Event::count(&state.db, &filter).await?;

    Ok(ApiResponse::ok(
        "Events retrieved",
        Paginated {
            items,
            page: filter.page(),
            per_page: filter.limit(),
            total,
        },
    ))
}

/// Get an event by ID with its attending count
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<EventDetail>> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    let attending = Registration::count_attending(&state.db, event.id).await?;

    Ok(ApiResponse::ok(
        "Event retrieved",
        EventDetail { event, attending },
    ))
}

/// Find future events near a point
///
/// Events without coordinates are ineligible and never returned.
pub async fn nearby_events(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<ApiResponse<Vec<Event>>> {
    if geo::Coordinates::new(query.latitude, query.longitude).is_none() {
        return Err(ApiError::BadRequest(
            "Invalid latitude/longitude".to_string(),
        ));
    }
    if !query.radius_km.is_finite() || query.radius_km < 0.0 {
        return Err(ApiError::BadRequest("Invalid radius".to_string()));
    }

    let events = Event::nearby(&state.db, query.latitude, query.longitude, query.radius_km).await?;

    Ok(ApiResponse::ok("Nearby events retrieved", events))
}

/// List events the caller holds an active registration for
pub async fn my_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<Event>>> {
    let events = Event::list_registered_by_user(&state.db, auth.user_id).await?;

    Ok(ApiResponse::ok("Registered events retrieved", events))
}

/// Create an event with the caller as organizer
pub async fn create_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<ApiResponse<Event>> {
    req.validate()?;

    if req.end_time <= req.start_time {
        return Err(validation_error("end_time", "End time must be after start time"));
    }

    check_coordinates(req.latitude, req.longitude)?;

    let status = match req.status {
        None => EventStatus::Upcoming,
        Some(s @ (EventStatus::Draft | EventStatus::Upcoming)) => s,
        Some(_) => {
            return Err(validation_error(
                "status",
                "New events must be draft or upcoming",
            ))
        }
    };

    // Invalid community reference is a validation failure, not a 500
    if Community::find_by_id(&state.db, req.community_id).await?.is_none() {
        return Err(validation_error("community_id", "Community does not exist"));
    }

    let event = Event::create(
        &state.db,
        CreateEvent {
            slug: unique_slug(&req.title),
            title: req.title,
            description: req.description,
            community_id: req.community_id,
            organizer_id: auth.user_id,
            start_time: req.start_time,
            end_time: req.end_time,
            location_name: req.location_name,
            address: req.address,
            latitude: req.latitude,
            longitude: req.longitude,
            capacity: req.capacity,
            registration_mode: req.registration_mode.unwrap_or(RegistrationMode::Auto),
            visibility: req.visibility.unwrap_or(Visibility::Public),
            status,
            tags: req.tags,
            image_url: req.image_url,
        },
    )
    .await?;

    tracing::info!(event_id = %event.id, organizer_id = %auth.user_id, "Event created");

    Ok(ApiResponse::created("Event created", event))
}

/// Update an event (organizer or admin)
pub async fn update_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<ApiResponse<Event>> {
    req.validate()?;

    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, event.organizer_id)?;

    // Check the time ordering of the merged result, not just the patch
    let new_start = req.start_time.unwrap_or(event.start_time);
    let new_end = req.end_time.unwrap_or(event.end_time);
    if new_end <= new_start {
        return Err(validation_error("end_time", "End time must be after start time"));
    }

    let new_lat = req.latitude.or(event.latitude);
    let new_lon = req.longitude.or(event.longitude);
    check_coordinates(new_lat, new_lon)?;

    let updated = Event::update(
        &state.db,
        id,
        UpdateEvent {
            title: req.title,
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
            location_name: req.location_name.map(Some),
            address: req.address.map(Some),
            latitude: req.latitude.map(Some),
            longitude: req.longitude.map(Some),
            capacity: req.capacity,
            registration_mode: req.registration_mode,
            visibility: req.visibility,
            status: req.status,
            tags: req.tags,
            image_url: req.image_url.map(Some),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    Ok(ApiResponse::ok("Event updated", updated))
}

/// Delete an event (organizer or admin)
///
/// Registrations and comments are removed by the cascade.
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, event.organizer_id)?;

    Event::delete(&state.db, id).await?;

    tracing::info!(event_id = %id, requester_id = %auth.user_id, "Event deleted");

    Ok(ApiResponse::message_only("Event deleted"))
}

/// Register the caller for an event
///
/// Idempotent; repeated calls return the existing registration.
pub async fn register(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Registration>> {
    let registration = Registration::register(&state.db, id, auth.user_id).await?;

    Ok(ApiResponse::ok("Registered for event", registration))
}

/// Cancel the caller's registration for an event
///
/// Having no active registration is a negative result, not an error.
pub async fn unregister(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Registration>> {
    match Registration::unregister(&state.db, id, auth.user_id).await? {
        Some(registration) => Ok(ApiResponse::ok("Registration cancelled", registration)),
        None => Ok(ApiResponse::message_only("No active registration")),
    }
}

/// List an event's active registrations (organizer or admin)
pub async fn list_registrations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<Registration>>> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, event.organizer_id)?;

    let registrations = Registration::list_by_event(&state.db, id).await?;

    Ok(ApiResponse::ok("Registrations retrieved", registrations))
}

/// Check in a registered attendee (organizer or admin)
pub async fn check_in(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Registration>> {
    let event = Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    authorization::require_owner_or_admin(&auth, event.organizer_id)?;

    let registration = Registration::check_in(&state.db, id, user_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No registered attendee to check in".to_string())
        })?;

    Ok(ApiResponse::ok("Attendee checked in", registration))
}
