/// Failures the store reports to callers as typed values rather than as
/// opaque database errors. They travel inside `anyhow::Error` and are
/// recovered with `downcast_ref` at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    /// The input failed validation before reaching the database.
    #[error("{0}")]
    Invalid(String),
}

/// Map a unique/foreign-key violation to [`StoreError::Conflict`], anything
/// else to a plain database error.
pub(crate) fn conflict_or(err: rusqlite::Error, message: impl Into<String>) -> anyhow::Error {
    if crate::membership::is_constraint_violation(&err) {
        StoreError::Conflict(message.into()).into()
    } else {
        err.into()
    }
}
