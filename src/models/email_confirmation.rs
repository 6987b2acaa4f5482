use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How long a confirmation code stays valid.
pub const CONFIRMATION_TTL_MINUTES: i64 = 90;

/// The email confirmation record owned by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailConfirmation {
    /// The ID of the user this record belongs to.
    pub user_id: Uuid,
    /// Whether the email address has been confirmed.
    pub is_confirmed: bool,
    /// The code sent in the confirmation email.
    pub confirmation_code: Uuid,
    /// When the code stops being accepted.
    pub expiration_date: DateTime<Utc>,
}

impl EmailConfirmation {
    /// A fresh, unconfirmed record with a new code.
    pub fn pending(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_confirmed: false,
            confirmation_code: Uuid::new_v4(),
            expiration_date: Utc::now() + Duration::minutes(CONFIRMATION_TTL_MINUTES),
        }
    }

    /// A record for accounts created already confirmed.
    pub fn confirmed(user_id: Uuid) -> Self {
        Self {
            is_confirmed: true,
            ..Self::pending(user_id)
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiration_date
    }

    /// Replaces the code and restarts the expiry window.
    pub fn regenerate(&mut self) {
        self.confirmation_code = Uuid::new_v4();
        self.expiration_date = Utc::now() + Duration::minutes(CONFIRMATION_TTL_MINUTES);
    }
}
