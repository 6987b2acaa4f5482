use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::{
        email_confirmation::EmailConfirmation,
        user::{BanState, NewUser, User},
    },
};

/// Persistence of users, their email confirmations and ban state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user whose login or email equals `key`.
    async fn find_by_login_or_email(&self, key: &str) -> Result<Option<User>>;

    /// Finds a user by their ID.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Writes the mutable user columns back.
    ///
    /// Returns the stored user as read after the write, or `None` when no
    /// row was updated.
    async fn save(&self, user: &User) -> Result<Option<User>>;

    /// Inserts a user together with its confirmation record and returns the new ID.
    async fn create(&self, user: NewUser, confirmation: EmailConfirmation) -> Result<Uuid>;

    /// Finds a user by ID only while a ban is in force.
    async fn get_banned_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Lists all users with a ban in force.
    async fn list_banned(&self) -> Result<Vec<User>>;

    /// Records a ban. Returns whether a row was written.
    async fn ban(&self, id: Uuid, reason: &str) -> Result<bool>;

    /// Lifts a ban in force. Returns whether a row was updated.
    async fn unban(&self, id: Uuid) -> Result<bool>;

    /// Finds the confirmation record holding `code`.
    async fn find_confirmation_by_code(&self, code: Uuid) -> Result<Option<EmailConfirmation>>;

    /// Overwrites the confirmation record of `confirmation.user_id`.
    async fn update_confirmation(&self, confirmation: &EmailConfirmation) -> Result<bool>;
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.login, u.email, u.password, u.role, u.refresh_token, u.created_at,
           b.ban_status, b.ban_reason, b.banned_at,
           c.is_confirmed, c.confirmation_code, c.expiration_date
    FROM users AS u
    LEFT JOIN bans AS b ON b.user_id = u.id
    LEFT JOIN email_confirmations AS c ON c.user_id = u.id
"#;

fn user_query(filter: &str) -> String {
    format!("{USER_SELECT} {filter}")
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let ban_status: Option<bool> = row.try_get("ban_status").map_err(|_| AppError::MissingData("ban_status".to_string()))?;
    let ban = match ban_status {
        Some(is_banned) => Some(BanState {
            is_banned,
            reason: row.try_get("ban_reason").map_err(|_| AppError::MissingData("ban_reason".to_string()))?,
            banned_at: row.try_get("banned_at").map_err(|_| AppError::MissingData("banned_at".to_string()))?,
        }),
        None => None,
    };

    let id: Uuid = row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?;
    let is_confirmed: Option<bool> = row.try_get("is_confirmed").map_err(|_| AppError::MissingData("is_confirmed".to_string()))?;
    let confirmation_code: Option<Uuid> = row.try_get("confirmation_code").map_err(|_| AppError::MissingData("confirmation_code".to_string()))?;
    let expiration_date: Option<DateTime<Utc>> = row.try_get("expiration_date").map_err(|_| AppError::MissingData("expiration_date".to_string()))?;

    let email_confirmation = match (is_confirmed, confirmation_code, expiration_date) {
        (Some(is_confirmed), Some(confirmation_code), Some(expiration_date)) => Some(EmailConfirmation {
            user_id: id,
            is_confirmed,
            confirmation_code,
            expiration_date,
        }),
        _ => None,
    };

    Ok(User {
        id,
        login: row.try_get("login").map_err(|_| AppError::MissingData("login".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        password: row.try_get("password").map_err(|_| AppError::MissingData("password".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        refresh_token: row.try_get("refresh_token").map_err(|_| AppError::MissingData("refresh_token".to_string()))?,
        ban,
        email_confirmation,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
    })
}

fn row_to_confirmation(row: &Row) -> Result<EmailConfirmation> {
    Ok(EmailConfirmation {
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        is_confirmed: row.try_get("is_confirmed").map_err(|_| AppError::MissingData("is_confirmed".to_string()))?,
        confirmation_code: row.try_get("confirmation_code").map_err(|_| AppError::MissingData("confirmation_code".to_string()))?,
        expiration_date: row.try_get("expiration_date").map_err(|_| AppError::MissingData("expiration_date".to_string()))?,
    })
}

/// Turns a violated `users` unique constraint into a `Conflict` naming the column.
///
/// Concurrent registrations can both pass the duplicate check; the constraint
/// decides which one is stored.
fn unique_violation_to_conflict(e: tokio_postgres::Error) -> AppError {
    if e.code() != Some(&SqlState::UNIQUE_VIOLATION) {
        return AppError::Database(e);
    }

    let constraint = e.as_db_error().and_then(|db| db.constraint()).unwrap_or_default();
    tracing::debug!("Unique violation on {}", constraint);
    AppError::Conflict(conflict_message(constraint).to_string())
}

fn conflict_message(constraint: &str) -> &'static str {
    if constraint.contains("email") {
        "User with this email already exists"
    } else {
        "User with this login already exists"
    }
}

/// PostgreSQL-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    /// Creates a new `PgUserStore` over a connection pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_login_or_email(&self, key: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                user_query("WHERE u.login = $1 OR u.email = $1 LIMIT 1").as_str(),
                &[&key],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(user_query("WHERE u.id = $1").as_str(), &[&id])
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn save(&self, user: &User) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE users
                SET
                    login = $2,
                    email = $3,
                    password = $4,
                    role = $5,
                    refresh_token = $6
                WHERE id = $1
                "#,
                &[&user.id, &user.login, &user.email, &user.password, &user.role, &user.refresh_token],
            )
            .await?;

        if updated == 0 {
            return Ok(None);
        }

        let row = client
            .query_opt(user_query("WHERE u.id = $1").as_str(), &[&user.id])
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn create(&self, user: NewUser, confirmation: EmailConfirmation) -> Result<Uuid> {
        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;

        transaction
            .execute(
                r#"
                INSERT INTO users (id, login, email, password, role)
                VALUES ($1, $2, $3, $4, $5)
                "#,
                &[&user.id, &user.login, &user.email, &user.password, &user.role],
            )
            .await
            .map_err(unique_violation_to_conflict)?;

        transaction
            .execute(
                r#"
                INSERT INTO email_confirmations (user_id, is_confirmed, confirmation_code, expiration_date)
                VALUES ($1, $2, $3, $4)
                "#,
                &[
                    &user.id,
                    &confirmation.is_confirmed,
                    &confirmation.confirmation_code,
                    &confirmation.expiration_date,
                ],
            )
            .await?;

        transaction.commit().await?;
        Ok(user.id)
    }

    async fn get_banned_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                user_query("WHERE u.id = $1 AND b.ban_status = true").as_str(),
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn list_banned(&self) -> Result<Vec<User>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                user_query("WHERE b.ban_status = true ORDER BY b.banned_at DESC").as_str(),
                &[],
            )
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn ban(&self, id: Uuid, reason: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let written = client
            .execute(
                r#"
                INSERT INTO bans (user_id, ban_status, ban_reason, banned_at)
                VALUES ($1, true, $2, NOW())
                ON CONFLICT (user_id) DO UPDATE
                SET ban_status = true, ban_reason = EXCLUDED.ban_reason, banned_at = EXCLUDED.banned_at
                "#,
                &[&id, &reason],
            )
            .await?;
        Ok(written > 0)
    }

    async fn unban(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE bans
                SET ban_status = false, ban_reason = NULL, banned_at = NULL
                WHERE user_id = $1 AND ban_status = true
                "#,
                &[&id],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn find_confirmation_by_code(&self, code: Uuid) -> Result<Option<EmailConfirmation>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT user_id, is_confirmed, confirmation_code, expiration_date
                FROM email_confirmations
                WHERE confirmation_code = $1
                "#,
                &[&code],
            )
            .await?;
        row.map(|r| row_to_confirmation(&r)).transpose()
    }

    async fn update_confirmation(&self, confirmation: &EmailConfirmation) -> Result<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE email_confirmations
                SET is_confirmed = $2, confirmation_code = $3, expiration_date = $4
                WHERE user_id = $1
                "#,
                &[
                    &confirmation.user_id,
                    &confirmation.is_confirmed,
                    &confirmation.confirmation_code,
                    &confirmation.expiration_date,
                ],
            )
            .await?;
        Ok(updated > 0)
    }
}
