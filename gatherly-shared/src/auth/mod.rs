/// Authentication and authorization
///
/// - `jwt`: Token generation and validation (HS256)
/// - `password`: Argon2id password hashing
/// - `middleware`: Axum middleware extracting an `AuthContext` from Bearer tokens
/// - `authorization`: Owner-or-admin checks and community role checks

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
