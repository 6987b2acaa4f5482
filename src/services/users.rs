use std::sync::Arc;

use uuid::Uuid;

use crate::{
    crypto::password::PasswordHasher,
    error::{AppError, Result},
    models::{
        email_confirmation::EmailConfirmation,
        user::{NewUser, Role, UserView},
    },
    outcome::{Outcome, StatusKind},
    repositories::user::UserStore,
    services::tokens::TokenService,
};

/// Administrative user commands.
pub struct UserAdminService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenService>,
}

impl UserAdminService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Creates a user whose email counts as confirmed.
    ///
    /// # Returns
    ///
    /// `Created` with the new user's ID.
    pub async fn create_user(&self, login: &str, email: &str, password: &str, role: Role) -> Outcome<Uuid> {
        Outcome::from_result(
            self.try_create_user(login, email, password, role).await,
            StatusKind::Created,
        )
    }

    async fn try_create_user(&self, login: &str, email: &str, password: &str, role: Role) -> Result<Uuid> {
        let password_hash = self.hasher.hash(password).await?;

        let user = NewUser {
            id: Uuid::new_v4(),
            login: login.to_string(),
            email: email.to_string(),
            password: password_hash,
            role,
        };
        let confirmation = EmailConfirmation::confirmed(user.id);

        let user_id = self.users.create(user, confirmation).await?;
        tracing::info!("✅ User created by admin: {}", user_id);
        Ok(user_id)
    }

    /// Bans a user and ends their session.
    pub async fn ban_user(&self, user_id: Uuid, reason: &str) -> Outcome {
        Outcome::from_result(self.try_ban_user(user_id, reason).await, StatusKind::NoContent)
    }

    async fn try_ban_user(&self, user_id: Uuid, reason: &str) -> Result<()> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User with this id was not found".to_string()))?;

        if !self.users.ban(user_id, reason).await? {
            return Err(AppError::Internal("Ban was not applied".to_string()));
        }

        self.tokens.revoke(user).await?;
        tracing::info!("⛔ User banned: {}", user_id);
        Ok(())
    }

    /// Lifts the ban of a banned user.
    pub async fn unban_user(&self, user_id: Uuid) -> Outcome {
        Outcome::from_result(self.try_unban_user(user_id).await, StatusKind::NoContent)
    }

    async fn try_unban_user(&self, user_id: Uuid) -> Result<()> {
        if self.users.get_banned_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(
                "Banned user with this id was not found".to_string(),
            ));
        }

        if !self.users.unban(user_id).await? {
            return Err(AppError::Internal("Unban was not applied".to_string()));
        }

        tracing::info!("✅ User unbanned: {}", user_id);
        Ok(())
    }

    /// Lists users with a ban in force.
    pub async fn list_banned(&self) -> Outcome<Vec<UserView>> {
        let result = self
            .users
            .list_banned()
            .await
            .map(|users| users.iter().map(UserView::from).collect());
        Outcome::from_result(result, StatusKind::Ok)
    }
}
