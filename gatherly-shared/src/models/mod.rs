/// Database models
///
/// Each model owns its CRUD and query methods, executed against a
/// `sqlx::PgPool`. Relationships are plain id references resolved by
/// explicit queries; the schema's foreign keys handle cascade deletes.

pub mod comment;
pub mod community;
pub mod event;
pub mod membership;
pub mod registration;
pub mod user;

/// Shared visibility level for communities and events
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed and readable by anyone
    Public,

    /// Only reachable by members
    Private,
}
