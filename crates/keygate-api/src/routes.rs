//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, verify};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the `/users` routes
pub fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/users/register", post(auth::register_handler))
        .route("/users/auth", post(auth::login_handler))
        .route("/users/check_token/:user_id", get(auth::check_token_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/users/me", get(auth::me_handler))
        .route("/users/verify", post(verify::verify_photo_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
