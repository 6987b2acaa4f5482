use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// The two kinds of token the service signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// How long a token of this kind stays valid.
    pub fn ttl(self) -> Duration {
        match self {
            TokenKind::Access => Duration::hours(24),
            TokenKind::Refresh => Duration::hours(72),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// The claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// The user the token was issued to.
    pub user_id: Uuid,
    /// The user's role at issue time.
    pub role: Role,
    /// Unique token ID; two tokens issued in the same second still differ.
    pub jti: Uuid,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expiration time (seconds since the epoch).
    pub exp: i64,
}

impl Claims {
    /// Claims for `user` expiring after the TTL of `kind`.
    pub fn for_user(user: &User, kind: TokenKind) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id,
            role: user.role,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + kind.ttl()).timestamp(),
        }
    }
}

/// A freshly issued access/refresh pair.
///
/// Only `encrypted_refresh_token` is ever written to storage.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub encrypted_refresh_token: String,
}

/// The body returned to clients after login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenView {
    pub access_token: String,
}
