use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
///
/// `user_name` is the business key used everywhere a caller refers to a user
/// (URLs, membership requests). The numeric `id` is assigned by the store.
/// Users are soft-deleted: a non-null `deleted_at` hides the row from every
/// lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub emails: Vec<Email>,
}

/// An e-mail address owned by a user. Addresses are unique across all users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    #[serde(rename = "email_id")]
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    pub subscribed: bool,
}

/// Input for creating a user together with its e-mail addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub user_name: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub emails: Vec<CreateEmailInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmailInput {
    pub email: String,
    #[serde(default)]
    pub subscribed: bool,
}
