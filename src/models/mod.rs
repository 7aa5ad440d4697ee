//! Domain models for the repository registry.
//!
//! # Entities
//!
//! - [`User`]: a person identified by `user_name`, owning [`Email`] addresses.
//!   Soft-deleted through `deleted_at`.
//! - [`Project`]: a named project with an author. Users join projects through
//!   rows of the `user_projects` association table.
//! - [`Component`]: a deliverable of a project, carrying its [`Release`]s.
//!
//! # Transient types
//!
//! - [`MembershipRequest`]: usernames to be resolved and added to a project.
//! - [`StatusMessage`]: the `{"error": ..}` / `{"success": ..}` reply body.

mod component;
mod membership;
mod project;
mod status;
mod user;

pub use component::*;
pub use membership::*;
pub use project::*;
pub use status::*;
pub use user::*;
