use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Routes restricted to callers holding the administrative authority. The
/// authority check for account deletion lives inside the account service
/// (before any store access); the remaining handlers check the caller's
/// context themselves.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/users
        // Account creation with an explicit requested role set. Unknown role
        // names are dropped during resolution.
        .route("/users", post(handlers::create_user))
        // DELETE /admin/users/{id}
        // Removes an account and returns the removed snapshot.
        .route("/users/{id}", delete(handlers::delete_user))
        // GET /admin/roles
        // Lists every role known to the Role Store.
        .route("/roles", get(handlers::list_roles))
}
