mod error;
mod schema;

pub use error::StoreError;
pub(crate) use error::conflict_or;
pub(crate) use schema::run_migrations;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::membership::{self, EntityResolver, MembershipChange, MembershipError};
use crate::models::*;

const USER_COLUMNS: &str =
    "id, user_name, type, name, active, created_at, updated_at, deleted_at";
const PROJECT_COLUMNS: &str = "id, author, project_name, created_at";
const COMPONENT_COLUMNS: &str = "id, project_id, component_name, project_name";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "repo-api")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("repo-api.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn get_all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY id"
        ))?;

        let mut users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for user in &mut users {
            user.emails = load_emails(&conn, user.id)?;
        }

        Ok(users)
    }

    pub fn get_user_by_name(&self, user_name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let Some(mut user) = find_user(&conn, user_name)? else {
            return Ok(None);
        };
        user.emails = load_emails(&conn, user.id)?;
        Ok(Some(user))
    }

    /// Create a user and its e-mail addresses in one transaction.
    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        if input.user_name.trim().is_empty() {
            return Err(StoreError::Invalid("invalid user_name".to_string()).into());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO users (user_name, type, name, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &input.user_name,
                &input.user_type,
                &input.name,
                input.active,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| {
            conflict_or(
                e,
                format!("User with username {} already exists", input.user_name),
            )
        })?;
        let user_id = tx.last_insert_rowid();

        let mut emails = Vec::with_capacity(input.emails.len());
        for email in input.emails {
            tx.execute(
                "INSERT INTO emails (user_id, email, subscribed) VALUES (?, ?, ?)",
                (user_id, &email.email, email.subscribed),
            )
            .map_err(|e| conflict_or(e, format!("Email {} is already registered", email.email)))?;

            emails.push(Email {
                id: tx.last_insert_rowid(),
                user_id,
                email: email.email,
                subscribed: email.subscribed,
            });
        }

        tx.commit()?;
        tracing::info!("Created user {} ({})", input.user_name, user_id);

        Ok(User {
            id: user_id,
            user_name: input.user_name,
            user_type: input.user_type,
            name: input.name,
            active: input.active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            emails,
        })
    }

    /// Mark a user as deleted. Returns false when no live user has this id.
    pub fn soft_delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            (&now, &now, id),
        )?;
        Ok(rows > 0)
    }

    /// Projects the user is a member of, or `None` if the user does not exist.
    pub fn get_user_projects(&self, user_name: &str) -> Result<Option<Vec<Project>>> {
        let conn = self.conn()?;
        let Some(user) = find_user(&conn, user_name)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT p.id, p.author, p.project_name, p.created_at
             FROM projects p JOIN user_projects up ON up.project_id = p.id
             WHERE up.user_id = ? ORDER BY p.project_name",
        )?;
        let projects = stmt
            .query_map([user.id], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(projects))
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<ProjectWithComponents>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY project_name"
        ))?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        projects
            .into_iter()
            .map(|project| -> Result<ProjectWithComponents> {
                let components = load_components(&conn, project.id)?;
                Ok(ProjectWithComponents {
                    project,
                    components,
                })
            })
            .collect()
    }

    pub fn get_project_by_name(&self, project_name: &str) -> Result<Option<ProjectWithComponents>> {
        let conn = self.conn()?;
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_name = ?"),
                [project_name],
                project_from_row,
            )
            .optional()?;

        let Some(project) = project else {
            return Ok(None);
        };
        let components = load_components(&conn, project.id)?;

        Ok(Some(ProjectWithComponents {
            project,
            components,
        }))
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        if input.author.trim().is_empty() {
            return Err(StoreError::Invalid("invalid user_name".to_string()).into());
        }
        if input.project_name.trim().is_empty() {
            return Err(StoreError::Invalid("invalid project_name".to_string()).into());
        }

        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (author, project_name, created_at) VALUES (?, ?, ?)",
            (&input.author, &input.project_name, now.to_rfc3339()),
        )
        .map_err(|e| {
            conflict_or(
                e,
                format!("Project {} already exists", input.project_name),
            )
        })?;

        let id = conn.last_insert_rowid();
        tracing::info!("Created project {} ({})", input.project_name, id);

        Ok(Project {
            id,
            author: input.author,
            project_name: input.project_name,
            created_at: now,
        })
    }

    /// Usernames of the live members of a project, or `None` if the project
    /// does not exist.
    pub fn get_project_members(&self, project_name: &str) -> Result<Option<Vec<String>>> {
        let conn = self.conn()?;
        let Some(project_id) = EntityResolver::new(&conn).resolve_project(project_name)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT u.user_name FROM users u JOIN user_projects up ON up.user_id = u.id
             WHERE up.project_id = ? AND u.deleted_at IS NULL ORDER BY u.user_name",
        )?;
        let members = stmt
            .query_map([project_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(members))
    }

    // ============================================================
    // Membership operations
    // ============================================================

    /// Add the requested users to a project as a single atomic batch.
    ///
    /// The whole resolve-then-insert sequence runs in one immediate
    /// transaction. It is committed only if every membership was inserted;
    /// on any error the transaction is dropped and rolled back.
    pub fn add_project_members(
        &self,
        project_name: &str,
        request: &MembershipRequest,
    ) -> Result<MembershipChange, MembershipError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let change = membership::reconcile_members(&tx, project_name, request)?;
        tx.commit()?;

        tracing::info!(
            "Added {} member(s) to project {}",
            change.added.len(),
            project_name
        );
        Ok(change)
    }

    // ============================================================
    // Component operations
    // ============================================================

    pub fn get_all_components(&self) -> Result<Vec<Component>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM components ORDER BY id"
        ))?;

        let mut components = stmt
            .query_map([], component_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for component in &mut components {
            component.releases = load_releases(&conn, component.id)?;
        }

        Ok(components)
    }

    pub fn get_component_by_name(&self, component_name: &str) -> Result<Option<Component>> {
        let conn = self.conn()?;
        let component = conn
            .query_row(
                &format!(
                    "SELECT {COMPONENT_COLUMNS} FROM components WHERE component_name = ? ORDER BY id LIMIT 1"
                ),
                [component_name],
                component_from_row,
            )
            .optional()?;

        let Some(mut component) = component else {
            return Ok(None);
        };
        component.releases = load_releases(&conn, component.id)?;
        Ok(Some(component))
    }

    /// Create a component and its releases under the named project.
    ///
    /// Returns `None` when the project does not exist.
    pub fn create_component(&self, input: CreateComponentInput) -> Result<Option<Component>> {
        if input.component_name.trim().is_empty() {
            return Err(StoreError::Invalid("invalid component_name".to_string()).into());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(project_id) = EntityResolver::new(&tx).resolve_project(&input.project_name)?
        else {
            return Ok(None);
        };

        tx.execute(
            "INSERT INTO components (project_id, component_name, project_name) VALUES (?, ?, ?)",
            (project_id, &input.component_name, &input.project_name),
        )?;
        let component_id = tx.last_insert_rowid();

        let now = Utc::now();
        let mut releases = Vec::with_capacity(input.releases.len());
        for release in input.releases {
            tx.execute(
                "INSERT INTO releases (component_id, version, url, created_at) VALUES (?, ?, ?, ?)",
                (component_id, &release.version, &release.url, now.to_rfc3339()),
            )?;
            releases.push(Release {
                id: tx.last_insert_rowid(),
                component_id,
                version: release.version,
                url: release.url,
                created_at: now,
            });
        }

        tx.commit()?;
        tracing::info!(
            "Created component {} in project {}",
            input.component_name,
            input.project_name
        );

        Ok(Some(Component {
            id: component_id,
            project_id,
            component_name: input.component_name,
            project_name: input.project_name,
            releases,
        }))
    }
}

fn find_user(conn: &Connection, user_name: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE user_name = ? AND deleted_at IS NULL"),
        [user_name],
        user_from_row,
    )
    .optional()
}

fn load_emails(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Email>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, email, subscribed FROM emails WHERE user_id = ? ORDER BY id",
    )?;
    let emails = stmt
        .query_map([user_id], |row| {
            Ok(Email {
                id: row.get(0)?,
                user_id: row.get(1)?,
                email: row.get(2)?,
                subscribed: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(emails)
}

fn load_components(conn: &Connection, project_id: i64) -> rusqlite::Result<Vec<Component>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM components WHERE project_id = ? ORDER BY component_name"
    ))?;
    let mut components = stmt
        .query_map([project_id], component_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for component in &mut components {
        component.releases = load_releases(conn, component.id)?;
    }
    Ok(components)
}

fn load_releases(conn: &Connection, component_id: i64) -> rusqlite::Result<Vec<Release>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, component_id, version, url, created_at
         FROM releases WHERE component_id = ? ORDER BY id",
    )?;
    let releases = stmt
        .query_map([component_id], |row| {
            Ok(Release {
                id: row.get(0)?,
                component_id: row.get(1)?,
                version: row.get(2)?,
                url: row.get(3)?,
                created_at: parse_datetime(row.get::<_, String>(4)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(releases)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_name: row.get(1)?,
        user_type: row.get(2)?,
        name: row.get(3)?,
        active: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
        deleted_at: row.get::<_, Option<String>>(7)?.map(parse_datetime),
        emails: Vec::new(),
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        author: row.get(1)?,
        project_name: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
    })
}

fn component_from_row(row: &Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        id: row.get(0)?,
        project_id: row.get(1)?,
        component_name: row.get(2)?,
        project_name: row.get(3)?,
        releases: Vec::new(),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
