//! Router assembly: the `/users` resource surface plus `/metrics`.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the application router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::soft_delete_user),
        )
        .route("/users/{id}/restore", put(handlers::restore_user))
        .route("/users/batch/{action}", delete(handlers::batch_delete_users))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
