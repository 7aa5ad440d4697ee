//! HTTP registry of users, projects, components and project membership.
//!
//! - [`db`]: SQLite-backed store and embedded migrations.
//! - [`membership`]: resolving and inserting project memberships.
//! - [`api`]: the axum router under `/v1`.

pub mod api;
pub mod db;
pub mod membership;
pub mod models;
