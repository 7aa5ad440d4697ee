use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Component;

/// A project that users can be members of.
///
/// `project_name` is the business key callers use in URLs. `author` holds the
/// username of whoever registered the project; it is not a foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "project_id")]
    pub id: i64,
    pub author: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub project_name: String,
}

/// A project with its components, used for detailed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithComponents {
    #[serde(flatten)]
    pub project: Project,
    pub components: Vec<Component>,
}
