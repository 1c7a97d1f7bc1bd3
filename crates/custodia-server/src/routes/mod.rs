//! API routes.
//!
//! All payloads ride the `{data, error}` envelope; errors map to HTTP
//! status codes in [`crate::error::ApiError`].

pub mod accounts;
pub mod health;
pub mod users;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::AppState;

/// Builds the application router.
pub fn api_router() -> Router<AppState> {
    let v1 = Router::new()
        .route("/users", post(users::create_user).get(users::index_users))
        .route("/users/signin", post(users::signin_user))
        .route(
            "/users/{slug}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{slug}/verify/{token}", get(users::confirm_user))
        .route(
            "/accounts",
            post(accounts::create_account).get(accounts::index_accounts),
        )
        .route(
            "/accounts/{slug}",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        );

    Router::new()
        .route("/healthz", get(health::healthz))
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
