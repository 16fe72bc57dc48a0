/// Registration model and the register/unregister workflow
///
/// A registration links a user to an event's attendance. At most one active
/// (non-cancelled) registration may exist per (event, user) pair, enforced
/// by a partial unique index:
///
/// ```sql
/// CREATE UNIQUE INDEX idx_registrations_active_unique
///     ON registrations(event_id, user_id)
///     WHERE status <> 'cancelled';
/// ```
///
/// # Capacity under concurrency
///
/// `register` runs its capacity check and insert inside a single
/// transaction that locks the event row with `SELECT ... FOR UPDATE`.
/// Concurrent registrations for the same event serialize on that lock, so
/// the attending count can never exceed a positive capacity. The partial
/// unique index backstops duplicate active rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::event::RegistrationMode;

/// Registration lifecycle status
///
/// Everything except `Cancelled` counts as active for the one-per-user
/// invariant; `Registered` and `CheckedIn` consume capacity, `Waitlisted`
/// does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,

    Waitlisted,

    CheckedIn,

    Cancelled,
}

impl RegistrationStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, RegistrationStatus::Cancelled)
    }

    /// Whether this status occupies a capacity slot
    pub fn is_attending(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Registered | RegistrationStatus::CheckedIn
        )
    }
}

/// Registration record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Registration {
    pub id: Uuid,

    pub event_id: Uuid,

    pub user_id: Uuid,

    pub community_id: Uuid,

    pub status: RegistrationStatus,

    pub registered_at: DateTime<Utc>,

    pub cancelled_at: Option<DateTime<Utc>>,

    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Error type for the registration workflow
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Target event doesn't exist
    #[error("Event {0} not found")]
    EventNotFound(Uuid),

    /// Event is full
    #[error("Event capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: i32 },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The slice of the event row the workflow needs, read under lock
#[derive(Debug, sqlx::FromRow)]
struct EventSlot {
    community_id: Uuid,
    capacity: i32,
    registration_mode: RegistrationMode,
}

const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, community_id, status, registered_at, cancelled_at, checked_in_at";

impl Registration {
    /// Registers a user for an event
    ///
    /// Idempotent: if the user already holds an active registration, that
    /// registration is returned unchanged. New registrations are confirmed
    /// immediately for auto-mode events and waitlisted for manual-mode
    /// events; waitlisted rows don't consume capacity.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EventNotFound`] when the event is absent
    /// - [`RegistrationError::CapacityExceeded`] when capacity is set and
    ///   the attending count has reached it
    pub async fn register(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Self, RegistrationError> {
        let mut tx = pool.begin().await?;

        // Lock the event row so concurrent registrations serialize here.
        let event = sqlx::query_as::<_, EventSlot>(
            "SELECT community_id, capacity, registration_mode FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RegistrationError::EventNotFound(event_id))?;

        // Re-registering is a no-op: return the active registration as-is.
        let existing = sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS} FROM registrations
            WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(registration) = existing {
            tx.commit().await?;
            return Ok(registration);
        }

        let status = match event.registration_mode {
            RegistrationMode::Auto => RegistrationStatus::Registered,
            RegistrationMode::Manual => RegistrationStatus::Waitlisted,
        };

        // Capacity only applies to slots that are actually consumed.
        if event.capacity > 0 && status.is_attending() {
            let attending: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM registrations
                WHERE event_id = $1 AND status IN ('registered', 'checked_in')
                "#,
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

            if attending >= i64::from(event.capacity) {
                return Err(RegistrationError::CapacityExceeded {
                    capacity: event.capacity,
                });
            }
        }

        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            INSERT INTO registrations (event_id, user_id, community_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(event.community_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(registration)
    }

    /// Cancels a user's active registration for an event
    ///
    /// Soft-cancel: the row survives with status `Cancelled` and a
    /// `cancelled_at` timestamp. Returns `None` (not an error) when the
    /// user has no active registration.
    pub async fn unregister(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(registration)
    }

    /// Marks a registered attendee as checked in
    ///
    /// Only `Registered` rows transition; returns `None` when the user has
    /// no registration in that state.
    pub async fn check_in(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET status = 'checked_in', checked_in_at = NOW()
            WHERE event_id = $1 AND user_id = $2 AND status = 'registered'
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(registration)
    }

    /// Finds a user's active registration for an event
    pub async fn find_active(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let registration = sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS} FROM registrations
            WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(registration)
    }

    /// Counts attendees occupying capacity slots for an event
    pub async fn count_attending(pool: &PgPool, event_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM registrations
            WHERE event_id = $1 AND status IN ('registered', 'checked_in')
            "#,
        )
        .bind(event_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Lists an event's active registrations, oldest first
    pub async fn list_by_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let registrations = sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS} FROM registrations
            WHERE event_id = $1 AND status <> 'cancelled'
            ORDER BY registered_at, id
            "#
        ))
        .bind(event_id)
        .fetch_all(pool)
        .await?;

        Ok(registrations)
    }
}
