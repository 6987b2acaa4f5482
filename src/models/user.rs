use chrono::{DateTime, Utc};
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::email_confirmation::EmailConfirmation;

/// The role a user acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSql, FromSql)]
#[serde(rename_all = "lowercase")]
#[postgres(name = "user_role")]
pub enum Role {
    #[postgres(name = "user")]
    User,
    #[postgres(name = "admin")]
    Admin,
}

/// The ban state of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanState {
    /// Whether the ban is in force.
    pub is_banned: bool,
    /// The reason given by the administrator.
    pub reason: Option<String>,
    /// When the ban was applied.
    pub banned_at: Option<DateTime<Utc>>,
}

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's login.
    pub login: String,
    /// The user's email address.
    pub email: String,
    /// The user's hashed password.
    pub password: String,
    /// The user's role.
    pub role: Role,
    /// The encrypted refresh token of the current session, if any.
    pub refresh_token: Option<String>,
    /// The user's ban state, if a ban was ever recorded.
    pub ban: Option<BanState>,
    /// The user's email confirmation record.
    pub email_confirmation: Option<EmailConfirmation>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether a ban is currently in force.
    pub fn is_banned(&self) -> bool {
        self.ban.as_ref().is_some_and(|ban| ban.is_banned)
    }

    /// Whether the user has confirmed their email address.
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmation
            .as_ref()
            .is_some_and(|confirmation| confirmation.is_confirmed)
    }
}

/// The fields needed to insert a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// The public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub role: Role,
    pub is_email_confirmed: bool,
    pub ban: Option<BanState>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            email: user.email.clone(),
            role: user.role,
            is_email_confirmed: user.is_email_confirmed(),
            ban: user.ban.clone().filter(|ban| ban.is_banned),
            created_at: user.created_at,
        }
    }
}
