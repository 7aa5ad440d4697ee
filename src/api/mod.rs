mod error;
mod handlers;
pub mod middleware;

pub use error::{ApiError, INVALID_MEMBERS, PROJECT_MISSING};
pub use middleware::SecurityConfig;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::db::Database;

/// Router with authentication disabled and permissive CORS.
pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Users
        .route("/users", get(handlers::list_users))
        .route("/users/{id}", delete(handlers::delete_user))
        .route("/user", post(handlers::create_user))
        .route("/user/{username}", get(handlers::get_user))
        .route("/user/{username}/projects", get(handlers::get_user_projects))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/project", post(handlers::create_project))
        .route("/project/{name}", get(handlers::get_project))
        .route("/project/{name}/members", get(handlers::list_project_members))
        .route(
            "/project/{name}/members/create",
            put(handlers::update_user_project),
        )
        // Components
        .route("/components", get(handlers::list_components))
        .route("/component/create", post(handlers::create_component))
        .route("/component/{name}", get(handlers::get_component))
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without credentials
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security.cors_layer()),
        )
        .with_state(db)
}
