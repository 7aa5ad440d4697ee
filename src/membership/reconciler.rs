use rusqlite::{Connection, ErrorCode};

/// Result of one reconciliation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// User ids whose membership row was inserted.
    pub inserted: Vec<i64>,
    /// User ids rejected by the `(user_id, project_id)` uniqueness constraint.
    pub rejected: Vec<i64>,
    /// Logical AND over every insert attempt in the batch.
    pub all_succeeded: bool,
}

/// Inserts rows into the `user_projects` association table.
///
/// The reconciler does not own a transaction. Callers that need the batch to
/// be all-or-nothing run it inside one and decide whether to commit from the
/// returned report.
pub struct MembershipReconciler<'c> {
    conn: &'c Connection,
}

impl<'c> MembershipReconciler<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Attempt one insert per user id, continuing past uniqueness violations.
    ///
    /// Any store failure other than a constraint violation aborts the batch.
    pub fn add_memberships(
        &self,
        project_id: i64,
        user_ids: &[i64],
    ) -> rusqlite::Result<ReconcileReport> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO user_projects (user_id, project_id) VALUES (?, ?)")?;

        let mut report = ReconcileReport {
            inserted: Vec::with_capacity(user_ids.len()),
            rejected: Vec::new(),
            all_succeeded: true,
        };

        for &user_id in user_ids {
            let succeeded = match stmt.execute((user_id, project_id)) {
                Ok(_) => {
                    report.inserted.push(user_id);
                    true
                }
                Err(err) if is_constraint_violation(&err) => {
                    tracing::debug!(
                        "membership ({}, {}) rejected: {}",
                        user_id,
                        project_id,
                        err
                    );
                    report.rejected.push(user_id);
                    false
                }
                Err(err) => return Err(err),
            };
            report.all_succeeded &= succeeded;
        }

        Ok(report)
    }
}

/// True for SQLite constraint failures (unique, primary key, foreign key).
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, user_name, created_at, updated_at) VALUES (7, 'bob', 'x', 'x');
             INSERT INTO users (id, user_name, created_at, updated_at) VALUES (9, 'carol', 'x', 'x');
             INSERT INTO projects (id, author, project_name, created_at) VALUES (1, 'bob', 'alpha', 'x');",
        )
        .unwrap();
        conn
    }

    fn membership_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM user_projects", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn inserts_every_new_pair() {
        let conn = seeded();
        let report = MembershipReconciler::new(&conn)
            .add_memberships(1, &[7, 9])
            .unwrap();

        assert!(report.all_succeeded);
        assert_eq!(report.inserted, vec![7, 9]);
        assert!(report.rejected.is_empty());
        assert_eq!(membership_count(&conn), 2);
    }

    #[test]
    fn duplicate_pair_is_rejected_without_a_second_row() {
        let conn = seeded();
        let reconciler = MembershipReconciler::new(&conn);
        reconciler.add_memberships(1, &[7]).unwrap();

        let report = reconciler.add_memberships(1, &[7]).unwrap();

        assert!(!report.all_succeeded);
        assert_eq!(report.rejected, vec![7]);
        assert_eq!(membership_count(&conn), 1);
    }

    #[test]
    fn an_early_failure_is_not_masked_by_a_later_success() {
        let conn = seeded();
        let reconciler = MembershipReconciler::new(&conn);
        reconciler.add_memberships(1, &[7]).unwrap();

        let report = reconciler.add_memberships(1, &[7, 9]).unwrap();

        assert!(!report.all_succeeded);
        assert_eq!(report.inserted, vec![9]);
        assert_eq!(report.rejected, vec![7]);
    }

    #[test]
    fn empty_batch_succeeds() {
        let conn = seeded();
        let report = MembershipReconciler::new(&conn)
            .add_memberships(1, &[])
            .unwrap();
        assert!(report.all_succeeded);
        assert_eq!(membership_count(&conn), 0);
    }
}
