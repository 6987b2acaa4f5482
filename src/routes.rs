use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use crate::{handlers, middleware_layer, state::AppState};

/// Builds the application router without rate limiting.
#[cfg(test)]
pub fn router(state: AppState) -> Router {
    router_with(state, |public_routes| public_routes)
}

/// Builds the application router.
///
/// `limit_public` wraps the unauthenticated auth routes, which is where the
/// binary puts its rate limiter. CORS is layered on by the binary.
pub fn router_with(state: AppState, limit_public: impl FnOnce(Router) -> Router) -> Router {
    let public_routes = Router::new()
        .route("/auth/registration", post(handlers::auth::registration))
        .route(
            "/auth/registration-confirmation",
            post(handlers::auth::registration_confirmation),
        )
        .route(
            "/auth/registration-email-resending",
            post(handlers::auth::registration_email_resending),
        )
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh-token", post(handlers::auth::refresh_token))
        .route("/auth/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/users", post(handlers::users::create_user))
        .route("/users/banned", get(handlers::users::list_banned))
        .route("/users/{id}/ban", put(handlers::users::ban_user))
        .route("/users/{id}/ban", delete(handlers::users::unban_user))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_admin,
        ))
        .with_state(state);

    Router::new()
        .merge(limit_public(public_routes))
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
}
