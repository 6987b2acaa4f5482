use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    models::{token::TokenKind, user::Role},
    state::AppState,
};

/// Extracts the bearer token from the `Authorization` header.
///
/// # Arguments
///
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the token if the header is present and well formed.
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A middleware that requires a valid access token.
///
/// The verified `Claims` are inserted into the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking access token...");

    let claims = match extract_bearer_token(&request)
        .ok_or(AppError::Unauthorized)
        .and_then(|token| state.tokens.verify_token(token, TokenKind::Access))
    {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    tracing::debug!("✅ User authenticated: {}", claims.user_id);
    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// A middleware that requires an access token issued to an admin.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let claims = match extract_bearer_token(&request)
        .ok_or(AppError::Unauthorized)
        .and_then(|token| state.tokens.verify_token(token, TokenKind::Access))
    {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    if claims.role != Role::Admin {
        return AppError::Forbidden("Admin role required".to_string()).into_response();
    }

    tracing::debug!("✅ Admin authenticated: {}", claims.user_id);
    request.extensions_mut().insert(claims);
    next.run(request).await
}
