use axum::{extract::State, Extension};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, Result},
    models::{
        token::{AccessTokenView, Claims, TokenKind, TokenPair},
        user::UserView,
    },
    outcome::Outcome,
    state::AppState,
    validation::{auth::*, json::ValidJson},
};

/// The cookie that carries the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Creates the http-only refresh-token cookie.
fn create_refresh_cookie(value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(TokenKind::Refresh.ttl().num_seconds()));
    cookie.set_path("/");
    cookie
}

fn refresh_token_from(cookies: &Cookies) -> Result<String> {
    cookies
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            tracing::debug!("❌ No refresh token cookie found");
            AppError::Unauthorized
        })
}

/// Puts the refresh token into its cookie and leaves only the access token in the body.
fn into_session_response(
    state: &AppState,
    cookies: &Cookies,
    outcome: Outcome<TokenPair>,
) -> Outcome<AccessTokenView> {
    outcome.map(|pair| {
        cookies.add(create_refresh_cookie(
            pair.refresh_token,
            state.config.secure_cookies,
        ));
        AccessTokenView {
            access_token: pair.access_token,
        }
    })
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn registration(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegistrationInput>,
) -> Result<Outcome> {
    let input = validated(payload)?;
    Ok(state
        .auth
        .register(&input.login, &input.email, &input.password)
        .await)
}

/// Handles email confirmation.
pub async fn registration_confirmation(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ConfirmEmailInput>,
) -> Result<Outcome> {
    let input = validated(payload)?;
    Ok(state.auth.confirm_email(input.code).await)
}

/// Handles resending the confirmation email.
pub async fn registration_email_resending(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResendConfirmationInput>,
) -> Result<Outcome> {
    let input = validated(payload)?;
    Ok(state.auth.resend_confirmation(&input.email).await)
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ValidJson(payload): ValidJson<LoginInput>,
) -> Result<Outcome<AccessTokenView>> {
    let input = validated(payload)?;
    let outcome = state
        .auth
        .login(&input.login_or_email, &input.password)
        .await;
    Ok(into_session_response(&state, &cookies, outcome))
}

/// Handles refresh-token rotation.
pub async fn refresh_token(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Outcome<AccessTokenView>> {
    let refresh_token = refresh_token_from(&cookies)?;
    let outcome = state.auth.refresh(&refresh_token).await;
    Ok(into_session_response(&state, &cookies, outcome))
}

/// Handles user logout.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Outcome> {
    let refresh_token = refresh_token_from(&cookies)?;
    let outcome = state.auth.logout(&refresh_token).await;

    if outcome.is_success() {
        let mut cookie = Cookie::new(REFRESH_COOKIE, "");
        cookie.set_max_age(Duration::seconds(0));
        cookie.set_path("/");
        cookies.remove(cookie);
    }

    Ok(outcome)
}

/// Returns the profile of the authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Outcome<UserView> {
    state.auth.me(claims.user_id).await
}
