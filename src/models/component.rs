use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deliverable belonging to a project, e.g. a library or a service.
///
/// The owning project's name is denormalised into `project_name` so a
/// component can be rendered without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "component_id")]
    pub id: i64,
    pub project_id: i64,
    pub component_name: String,
    pub project_name: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

/// A published version of a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    #[serde(rename = "release_id")]
    pub id: i64,
    pub component_id: i64,
    pub version: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a component under an existing project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComponentInput {
    pub component_name: String,
    pub project_name: String,
    #[serde(default)]
    pub releases: Vec<CreateReleaseInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseInput {
    pub version: String,
    #[serde(default)]
    pub url: String,
}
