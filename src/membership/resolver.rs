use rusqlite::{Connection, OptionalExtension};

/// Outcome of looking up one username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(i64),
    Missing,
}

/// Per-username outcomes of [`EntityResolver::resolve_users`], in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserResolution {
    entries: Vec<(String, Resolution)>,
}

impl UserResolution {
    pub fn entries(&self) -> &[(String, Resolution)] {
        &self.entries
    }

    pub fn all_exist(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, r)| matches!(r, Resolution::Found(_)))
    }

    /// Usernames that did not resolve, in request order.
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| *r == Resolution::Missing)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The resolved identifiers, positionally matching the request.
    ///
    /// Returns `None` as soon as one username is missing: there is no
    /// placeholder identifier for an absent user.
    pub fn user_ids(&self) -> Option<Vec<i64>> {
        self.entries
            .iter()
            .map(|(_, r)| match r {
                Resolution::Found(id) => Some(*id),
                Resolution::Missing => None,
            })
            .collect()
    }

    pub fn username_of(&self, user_id: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, r)| *r == Resolution::Found(user_id))
            .map(|(name, _)| name.as_str())
    }
}

/// Looks up projects and users by their business keys.
///
/// Absence is a normal outcome here; only store failures are errors.
pub struct EntityResolver<'c> {
    conn: &'c Connection,
}

impl<'c> EntityResolver<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn resolve_project(&self, project_name: &str) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM projects WHERE project_name = ?",
                [project_name],
                |row| row.get(0),
            )
            .optional()
    }

    /// Resolve every username, never stopping at the first miss.
    pub fn resolve_users<I, S>(&self, usernames: I) -> rusqlite::Result<UserResolution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM users WHERE user_name = ? AND deleted_at IS NULL")?;

        let mut entries = Vec::new();
        for username in usernames {
            let username = username.as_ref();
            let id: Option<i64> = stmt.query_row([username], |row| row.get(0)).optional()?;
            let resolution = match id {
                Some(id) => Resolution::Found(id),
                None => {
                    tracing::debug!("user with username {} not found", username);
                    Resolution::Missing
                }
            };
            entries.push((username.to_string(), resolution));
        }

        Ok(UserResolution { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, user_name, created_at, updated_at) VALUES (7, 'bob', 'x', 'x');
             INSERT INTO users (id, user_name, created_at, updated_at) VALUES (9, 'carol', 'x', 'x');
             INSERT INTO users (id, user_name, created_at, updated_at, deleted_at) VALUES (11, 'gone', 'x', 'x', 'x');
             INSERT INTO projects (id, author, project_name, created_at) VALUES (1, 'bob', 'alpha', 'x');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn resolves_existing_project_to_its_id() {
        let conn = seeded();
        let resolver = EntityResolver::new(&conn);
        assert_eq!(resolver.resolve_project("alpha").unwrap(), Some(1));
    }

    #[test]
    fn absent_project_is_none_not_an_error() {
        let conn = seeded();
        let resolver = EntityResolver::new(&conn);
        assert_eq!(resolver.resolve_project("missing").unwrap(), None);
    }

    #[test]
    fn project_lookup_is_exact_match() {
        let conn = seeded();
        let resolver = EntityResolver::new(&conn);
        assert_eq!(resolver.resolve_project("Alpha").unwrap(), None);
        assert_eq!(resolver.resolve_project("alph").unwrap(), None);
    }

    #[test]
    fn resolves_all_users_in_request_order() {
        let conn = seeded();
        let resolution = EntityResolver::new(&conn)
            .resolve_users(["carol", "bob"])
            .unwrap();

        assert!(resolution.all_exist());
        assert_eq!(resolution.user_ids(), Some(vec![9, 7]));
    }

    #[test]
    fn keeps_resolving_after_a_miss() {
        let conn = seeded();
        let resolution = EntityResolver::new(&conn)
            .resolve_users(["ghost", "bob", "phantom"])
            .unwrap();

        assert!(!resolution.all_exist());
        assert_eq!(resolution.entries().len(), 3);
        assert_eq!(resolution.entries()[1].1, Resolution::Found(7));
        assert_eq!(resolution.missing(), vec!["ghost", "phantom"]);
        assert_eq!(resolution.user_ids(), None);
    }

    #[test]
    fn soft_deleted_users_do_not_resolve() {
        let conn = seeded();
        let resolution = EntityResolver::new(&conn).resolve_users(["gone"]).unwrap();
        assert_eq!(resolution.missing(), vec!["gone"]);
    }

    #[test]
    fn empty_request_trivially_exists() {
        let conn = seeded();
        let resolution = EntityResolver::new(&conn)
            .resolve_users(Vec::<String>::new())
            .unwrap();
        assert!(resolution.all_exist());
        assert_eq!(resolution.user_ids(), Some(vec![]));
    }
}
