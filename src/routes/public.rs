use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are unauthenticated and accessible to any client:
/// monitoring, self-service registration, and public article reads. No User
/// record listing is exposed here; all account reads require a caller
/// identity so that visibility rules can be evaluated.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Self-service account creation. The new account always receives the
        // default role; requested roles are ignored on this route.
        .route("/register", post(handlers::register_user))
        // GET /articles
        // Lists all articles, newest first.
        .route("/articles", get(handlers::get_articles))
        // GET /articles/{id}
        // Retrieves a single article.
        .route("/articles/{id}", get(handlers::get_article))
}
