use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::Role;

/// Validates a deserialized payload, turning the report into `AppError::Validation`.
pub fn validated<T: Validate<Context = ()>>(payload: T) -> Result<T> {
    payload.validate()?;
    Ok(payload)
}

/// The request payload for user registration.
#[derive(Deserialize, Debug, Validate)]
pub struct RegistrationInput {
    #[garde(length(min = 3, max = 30), pattern(r"^[a-zA-Z0-9_-]+$"))]
    pub login: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 6, max = 20))]
    pub password: String,
}

/// The request payload for email confirmation.
#[derive(Deserialize, Debug, Validate)]
pub struct ConfirmEmailInput {
    #[garde(skip)]
    pub code: Uuid,
}

/// The request payload for resending the confirmation email.
#[derive(Deserialize, Debug, Validate)]
pub struct ResendConfirmationInput {
    #[garde(email)]
    pub email: String,
}

/// The request payload for user login.
#[derive(Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[garde(length(min = 1, max = 255))]
    pub login_or_email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The request payload for creating a user from the admin panel.
#[derive(Deserialize, Debug, Validate)]
pub struct CreateUserInput {
    #[garde(length(min = 3, max = 30), pattern(r"^[a-zA-Z0-9_-]+$"))]
    pub login: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 6, max = 20))]
    pub password: String,
    #[serde(default = "default_role")]
    #[garde(skip)]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

/// The request payload for banning a user.
#[derive(Deserialize, Debug, Validate)]
pub struct BanUserInput {
    #[garde(length(min = 1, max = 500))]
    pub reason: String,
}
