/// HTTP middleware
///
/// - `security`: OWASP-recommended security headers on every response
///
/// Authentication middleware lives in `gatherly_shared::auth::middleware`
/// so it stays next to the JWT code it depends on.

pub mod security;
