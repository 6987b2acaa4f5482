use std::sync::Arc;

use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    crypto::password::PasswordHasher,
    email::{templates, EmailSender},
    error::{AppError, Result},
    models::{
        email_confirmation::EmailConfirmation,
        token::TokenPair,
        user::{NewUser, Role, UserView},
    },
    outcome::{Outcome, StatusKind},
    repositories::user::UserStore,
    services::tokens::TokenService,
};

/// Registration and session commands.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    mailer: Arc<dyn EmailSender>,
    tokens: Arc<TokenService>,
    confirmation_url: String,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    /// Creates a new `AuthService`.
    ///
    /// # Arguments
    ///
    /// * `users` - The user store.
    /// * `hasher` - Hashes and verifies passwords.
    /// * `mailer` - Sends confirmation emails.
    /// * `tokens` - Issues and verifies token pairs.
    /// * `confirmation_url` - The page the confirmation link points to.
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn EmailSender>,
        tokens: Arc<TokenService>,
        confirmation_url: String,
    ) -> Self {
        Self {
            users,
            hasher,
            mailer,
            tokens,
            confirmation_url,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Registers a new user and sends the confirmation email.
    ///
    /// The user stays stored when the email cannot be sent; the caller gets
    /// `ServerError` and can ask for the email again with
    /// [`AuthService::resend_confirmation`].
    pub async fn register(&self, login: &str, email: &str, password: &str) -> Outcome {
        tracing::debug!("📝 Registration attempt: {}", login);
        Outcome::from_result(self.try_register(login, email, password).await, StatusKind::NoContent)
    }

    async fn try_register(&self, login: &str, email: &str, password: &str) -> Result<()> {
        if self.users.find_by_login_or_email(login).await?.is_some() {
            return Err(AppError::Conflict("User with this login already exists".to_string()));
        }

        if self.users.find_by_login_or_email(email).await?.is_some() {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }

        let password_hash = self.hasher.hash(password).await?;

        let user = NewUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            email: email.to_string(),
            password: password_hash,
            role: Role::User,
        };
        let confirmation = EmailConfirmation::pending(user.id);
        let code = confirmation.confirmation_code;

        let user_id = self.users.create(user, confirmation).await?;
        tracing::info!("✅ User registered: {}", user_id);

        self.send_confirmation(email, code).await
    }

    async fn send_confirmation(&self, email: &str, code: Uuid) -> Result<()> {
        self.mailer
            .send(
                email,
                templates::REGISTRATION_SUBJECT,
                &templates::registration(&self.confirmation_url, code),
            )
            .await
    }

    /// Confirms the email address that received `code`.
    pub async fn confirm_email(&self, code: Uuid) -> Outcome {
        Outcome::from_result(self.try_confirm_email(code).await, StatusKind::NoContent)
    }

    async fn try_confirm_email(&self, code: Uuid) -> Result<()> {
        let mut confirmation = self
            .users
            .find_confirmation_by_code(code)
            .await?
            .ok_or_else(|| AppError::Validation("Confirmation code is invalid".to_string()))?;

        if confirmation.is_confirmed {
            return Err(AppError::Validation("Email is already confirmed".to_string()));
        }

        if confirmation.is_expired() {
            return Err(AppError::Validation("Confirmation code has expired".to_string()));
        }

        confirmation.is_confirmed = true;
        if !self.users.update_confirmation(&confirmation).await? {
            return Err(AppError::Internal("Email confirmation was not saved".to_string()));
        }

        tracing::info!("✅ Email confirmed for user: {}", confirmation.user_id);
        Ok(())
    }

    /// Issues a new confirmation code for an unconfirmed address and mails it.
    pub async fn resend_confirmation(&self, email: &str) -> Outcome {
        Outcome::from_result(self.try_resend_confirmation(email).await, StatusKind::NoContent)
    }

    async fn try_resend_confirmation(&self, email: &str) -> Result<()> {
        let user = self
            .users
            .find_by_login_or_email(email)
            .await?
            .filter(|user| user.email == email)
            .ok_or_else(|| AppError::Validation("No user with this email".to_string()))?;

        let mut confirmation = user
            .email_confirmation
            .ok_or_else(|| AppError::MissingData("email_confirmation".to_string()))?;

        if confirmation.is_confirmed {
            return Err(AppError::Validation("Email is already confirmed".to_string()));
        }

        confirmation.regenerate();
        if !self.users.update_confirmation(&confirmation).await? {
            return Err(AppError::Internal("Confirmation code was not saved".to_string()));
        }

        self.send_confirmation(email, confirmation.confirmation_code).await?;
        tracing::info!("📧 Confirmation email resent for user: {}", user.id);
        Ok(())
    }

    /// Checks credentials and opens a session.
    pub async fn login(&self, login_or_email: &str, password: &str) -> Outcome<TokenPair> {
        tracing::debug!("🔐 Login attempt: {}", login_or_email);
        Outcome::from_result(self.try_login(login_or_email, password).await, StatusKind::Ok)
    }

    async fn try_login(&self, login_or_email: &str, password: &str) -> Result<TokenPair> {
        let invalid = || AppError::Authentication("Invalid login or password".to_string());

        let Some(user) = self.users.find_by_login_or_email(login_or_email).await? else {
            self.verify_against_dummy(password).await?;
            return Err(invalid());
        };

        if !self.hasher.verify(password, &user.password).await? {
            return Err(invalid());
        }

        if !user.is_email_confirmed() {
            return Err(AppError::Authentication("Email is not confirmed".to_string()));
        }

        if user.is_banned() {
            return Err(AppError::Forbidden("User is banned".to_string()));
        }

        let user_id = user.id;
        let pair = self.tokens.issue_session(user).await?;
        tracing::info!("✅ User logged in: {}", user_id);
        Ok(pair)
    }

    /// Runs a verification for an unknown login so it costs as much as a known one.
    async fn verify_against_dummy(&self, password: &str) -> Result<()> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hasher.hash("irisart-unknown-user"))
            .await?;
        self.hasher.verify(password, hash).await?;
        Ok(())
    }

    /// Exchanges a valid refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Outcome<TokenPair> {
        Outcome::from_result(self.try_refresh(refresh_token).await, StatusKind::Ok)
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let (user, pair) = self.tokens.rotate_refresh_token(refresh_token).await?;
        tracing::info!("🔄 Tokens rotated for user: {}", user.id);
        Ok(pair)
    }

    /// Ends the session the refresh token belongs to.
    pub async fn logout(&self, refresh_token: &str) -> Outcome {
        Outcome::from_result(self.try_logout(refresh_token).await, StatusKind::NoContent)
    }

    async fn try_logout(&self, refresh_token: &str) -> Result<()> {
        let user = self.tokens.verify_refresh_token(refresh_token).await?;
        let user_id = user.id;
        self.tokens.revoke(user).await?;
        tracing::info!("👋 User logged out: {}", user_id);
        Ok(())
    }

    /// The profile of the user an access token was issued to.
    pub async fn me(&self, user_id: Uuid) -> Outcome<UserView> {
        let result = self.users.get_by_id(user_id).await.and_then(|user| {
            user.map(|user| UserView::from(&user))
                .ok_or_else(|| AppError::NotFound("User not found".to_string()))
        });
        Outcome::from_result(result, StatusKind::Ok)
    }
}
