//! # Gatherly Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the Gatherly API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and authorization utilities
//! - `db`: Connection pool and migration helpers
//! - `geo`: Great-circle distance utilities for the nearby-events filter

pub mod auth;
pub mod db;
pub mod geo;
pub mod models;

/// Current version of the Gatherly shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
