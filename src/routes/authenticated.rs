use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes available to any caller who passed the authentication layer. Every
/// handler here receives a validated `CallerContext` carrying the caller's
/// identifier and granted authorities, which the account service uses for
/// its visibility filtering.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own stored account record.
        .route("/me", get(handlers::get_me))
        // GET /users
        // Lists accounts after row-level visibility filtering: callers see
        // their own record unless they hold the blanket read authority.
        .route("/users", get(handlers::list_users))
        // GET/PUT /users/{id}
        // Single-account lookup and partial update. Updates never re-hash the
        // credential and never re-resolve roles.
        .route(
            "/users/{id}",
            get(handlers::get_user).put(handlers::update_user),
        )
        // GET /users/by-username/{username}
        // Lookup by the unique username.
        .route(
            "/users/by-username/{username}",
            get(handlers::get_user_by_username),
        )
        // --- Article Writes ---
        // POST /articles
        .route("/articles", post(handlers::create_article))
        // PUT/DELETE /articles/{id}
        .route(
            "/articles/{id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
}
