/// API route handlers
///
/// Handlers parse and validate input, invoke model operations, and wrap
/// results in the response envelope. Status-code mapping happens only in
/// `crate::error`.
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (signup, login, refresh, logout)
/// - `events`: Event lifecycle, registration workflow, nearby filter
/// - `communities`: Community CRUD and membership
/// - `comments`: Event comments and moderation
/// - `users`: Profiles and admin user management

pub mod auth;
pub mod comments;
pub mod communities;
pub mod events;
pub mod health;
pub mod users;

/// Derives a unique URL-safe slug from a display name
///
/// Lowercases, collapses non-alphanumeric runs into single dashes, and
/// appends a short random suffix so independently created resources with
/// the same name never collide.
pub(crate) fn unique_slug(name: &str) -> String {
    let base: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let base = base
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let suffix = uuid::Uuid::new_v4().simple().to_string();

    if base.is_empty() {
        suffix[..12].to_string()
    } else {
        format!("{}-{}", base, &suffix[..8])
    }
}
