use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::db::Database;
use crate::models::*;

type ApiResult<T> = Result<T, ApiError>;

/// Decode a JSON body regardless of the request's `Content-Type`.
fn decode<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Users
// ============================================================

pub async fn list_users(State(db): State<Database>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(db.get_all_users()?))
}

pub async fn get_user(
    State(db): State<Database>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    db.get_user_by_name(&username)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("User with username {username} not found")))
}

pub async fn get_user_projects(
    State(db): State<Database>,
    Path(username): Path<String>,
) -> ApiResult<Json<Vec<Project>>> {
    db.get_user_projects(&username)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("User with username {username} not found")))
}

pub async fn create_user(
    State(db): State<Database>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<User>)> {
    let input = decode(&body)?;
    let user = db.create_user(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    State(db): State<Database>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if db.soft_delete_user(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("User with id {id} not found")))
    }
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
) -> ApiResult<Json<Vec<ProjectWithComponents>>> {
    Ok(Json(db.get_all_projects()?))
}

pub async fn get_project(
    State(db): State<Database>,
    Path(name): Path<String>,
) -> ApiResult<Json<ProjectWithComponents>> {
    db.get_project_by_name(&name)?
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found(format!("Project with project name {name} not found"))
        })
}

pub async fn create_project(
    State(db): State<Database>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let input = decode(&body)?;
    let project = db.create_project(input)?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_project_members(
    State(db): State<Database>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    db.get_project_members(&name)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(super::error::PROJECT_MISSING))
}

/// Add the users named in the body to a project.
///
/// 404 when the project is unknown, 400 when any user is unknown or already
/// a member. Nothing is written unless every member could be added.
pub async fn update_user_project(
    State(db): State<Database>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<StatusMessage>> {
    let request: MembershipRequest = decode(&body)?;
    db.add_project_members(&name, &request)?;
    Ok(Json(StatusMessage::success("Added to project")))
}

// ============================================================
// Components
// ============================================================

pub async fn list_components(State(db): State<Database>) -> ApiResult<Json<Vec<Component>>> {
    Ok(Json(db.get_all_components()?))
}

pub async fn get_component(
    State(db): State<Database>,
    Path(name): Path<String>,
) -> ApiResult<Json<Component>> {
    db.get_component_by_name(&name)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Component {name} not found")))
}

pub async fn create_component(
    State(db): State<Database>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Component>)> {
    let input = decode(&body)?;
    db.create_component(input)?
        .map(|c| (StatusCode::CREATED, Json(c)))
        .ok_or_else(|| ApiError::not_found(super::error::PROJECT_MISSING))
}
