//! Project membership reconciliation.
//!
//! Adding users to a project is a two step affair: the [`EntityResolver`]
//! turns the project name and every requested username into store ids, then
//! the [`MembershipReconciler`] inserts the `(user_id, project_id)` rows.
//! [`reconcile_members`] chains the two and refuses to insert anything when a
//! username did not resolve. Atomicity comes from the caller's transaction,
//! see [`crate::db::Database::add_project_members`].

mod reconciler;
mod resolver;

pub use reconciler::*;
pub use resolver::*;

use rusqlite::Connection;

use crate::models::MembershipRequest;

#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("Project {0} does not exist")]
    ProjectNotFound(String),

    #[error("Users not found: {}", .0.join(", "))]
    UnknownUsers(Vec<String>),

    #[error("Users already members: {}", .0.join(", "))]
    AlreadyMembers(Vec<String>),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Membership rows added by a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub project_id: i64,
    pub added: Vec<i64>,
}

/// Resolve `project_name` and every member of `request`, then insert the
/// memberships.
///
/// On `AlreadyMembers` some rows may have been written through `conn`; the
/// caller must roll its transaction back.
pub fn reconcile_members(
    conn: &Connection,
    project_name: &str,
    request: &MembershipRequest,
) -> Result<MembershipChange, MembershipError> {
    let resolver = EntityResolver::new(conn);

    let project_id = resolver
        .resolve_project(project_name)?
        .ok_or_else(|| MembershipError::ProjectNotFound(project_name.to_string()))?;

    let users = resolver.resolve_users(request.usernames())?;
    let Some(user_ids) = users.user_ids() else {
        let missing = users.missing().into_iter().map(str::to_owned).collect();
        return Err(MembershipError::UnknownUsers(missing));
    };

    let report = MembershipReconciler::new(conn).add_memberships(project_id, &user_ids)?;
    if !report.all_succeeded {
        let rejected = report
            .rejected
            .iter()
            .filter_map(|id| users.username_of(*id))
            .map(str::to_owned)
            .collect();
        return Err(MembershipError::AlreadyMembers(rejected));
    }

    Ok(MembershipChange {
        project_id,
        added: report.inserted,
    })
}
