use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::StoreError;
use crate::membership::MembershipError;
use crate::models::StatusMessage;

/// Reply for every rejected membership change. Missing users and users that
/// are already members are deliberately not told apart.
pub const INVALID_MEMBERS: &str = "Request body invalid, a user supplied is already a member of that project or a user supplied does not exist";

pub const PROJECT_MISSING: &str = "Project does not exist";

/// Error returned by handlers, rendered as a [`StatusMessage`] body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::Conflict(msg)) => Self::Conflict(msg.clone()),
            Some(StoreError::Invalid(msg)) => Self::BadRequest(msg.clone()),
            None => Self::Internal(err),
        }
    }
}

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::ProjectNotFound(name) => {
                tracing::debug!("Membership change for unknown project {}", name);
                Self::NotFound(PROJECT_MISSING.to_string())
            }
            MembershipError::UnknownUsers(_) | MembershipError::AlreadyMembers(_) => {
                tracing::warn!("Rejected membership change: {}", err);
                Self::BadRequest(INVALID_MEMBERS.to_string())
            }
            MembershipError::Sqlite(e) => Self::Internal(e.into()),
            MembershipError::Store(e) => Self::Internal(e),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!("Malformed request body: {}", err);
        Self::BadRequest(format!("Request body could not be decoded: {err}"))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            // Full error stays in the server log
            Self::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Conflict(msg) => msg,
        };
        (status, Json(StatusMessage::error(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_maps_to_409() {
        let err: anyhow::Error = StoreError::Conflict("taken".into()).into();
        let api = ApiError::from(err);
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.to_string(), "taken");
    }

    #[test]
    fn store_validation_maps_to_400() {
        let err: anyhow::Error = StoreError::Invalid("invalid user_name".into()).into();
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_store_errors_are_internal() {
        let api = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_users_and_duplicates_share_one_message() {
        let missing = ApiError::from(MembershipError::UnknownUsers(vec!["ghost".into()]));
        let duplicate = ApiError::from(MembershipError::AlreadyMembers(vec!["bob".into()]));

        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), duplicate.to_string());
        assert_eq!(missing.to_string(), INVALID_MEMBERS);
    }

    #[test]
    fn undecodable_body_maps_to_400() {
        let err = serde_json::from_slice::<crate::models::MembershipRequest>(b"{\"members\": 4")
            .unwrap_err();
        let api = ApiError::from(err);
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert!(api.to_string().starts_with("Request body could not be decoded"));
    }

    #[test]
    fn missing_project_maps_to_404() {
        let api = ApiError::from(MembershipError::ProjectNotFound("missing".into()));
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.to_string(), PROJECT_MISSING);
    }
}
