//! Issuing, verifying and rotating access/refresh token pairs.
//!
//! A refresh token is only accepted while its plaintext equals the decrypted
//! ciphertext stored on the user. Rotation and logout overwrite that
//! ciphertext, which makes every earlier refresh token permanently invalid
//! even if its signature and expiry still check out.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use subtle::ConstantTimeEq;

use crate::{
    crypto::cipher::SymmetricCipher,
    error::{AppError, Result},
    models::{
        token::{Claims, TokenKind, TokenPair},
        user::User,
    },
    repositories::user::UserStore,
};

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies tokens and owns the stored refresh-token lifecycle.
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
    cipher: Arc<dyn SymmetricCipher>,
    users: Arc<dyn UserStore>,
}

impl TokenService {
    /// Creates a new `TokenService`.
    ///
    /// # Arguments
    ///
    /// * `access_secret` - The HMAC secret for access tokens.
    /// * `refresh_secret` - The HMAC secret for refresh tokens.
    /// * `cipher` - Encrypts refresh tokens before they are stored.
    /// * `users` - The user store holding the encrypted refresh tokens.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        cipher: Arc<dyn SymmetricCipher>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: SigningKeys::from_secret(access_secret),
            refresh: SigningKeys::from_secret(refresh_secret),
            validation,
            cipher,
            users,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign(&self, claims: &Claims, kind: TokenKind) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys(kind).encoding)
            .map_err(|e| AppError::Token(format!("Failed to sign {} token: {}", kind.as_str(), e)))
    }

    /// Creates a signed token of `kind` carrying the user's ID and role.
    pub fn create_token(&self, user: &User, kind: TokenKind) -> Result<String> {
        self.sign(&Claims::for_user(user, kind), kind)
    }

    /// Verifies `token` with the secret of `kind`.
    ///
    /// Every failure (signature, expiry, structure) yields `Unauthorized`.
    pub fn verify_token(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token verification failed ({}): {}", kind.as_str(), e);
                AppError::Unauthorized
            })
    }

    /// Creates an access/refresh pair and the ciphertext of the refresh token.
    pub fn generate_token_pair(&self, user: &User) -> Result<TokenPair> {
        let access_token = self.create_token(user, TokenKind::Access)?;
        let refresh_token = self.create_token(user, TokenKind::Refresh)?;
        let encrypted_refresh_token = self.cipher.encrypt(&refresh_token)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            encrypted_refresh_token,
        })
    }

    /// Checks a presented refresh token against the one stored for its user.
    ///
    /// # Arguments
    ///
    /// * `presented` - The refresh token sent by the client.
    ///
    /// # Returns
    ///
    /// The user the token belongs to, or `Unauthorized` if the signature is
    /// invalid, the user is gone, no token is stored, or the stored token is
    /// a different one.
    pub async fn verify_refresh_token(&self, presented: &str) -> Result<User> {
        let claims = self.verify_token(presented, TokenKind::Refresh)?;

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let stored = user.refresh_token.as_deref().ok_or_else(|| {
            tracing::debug!("No refresh token stored for user {}", user.id);
            AppError::Unauthorized
        })?;

        let decrypted = self.cipher.decrypt(stored).map_err(|e| {
            tracing::error!("❌ Stored refresh token of user {} is unreadable: {}", user.id, e);
            AppError::Unauthorized
        })?;

        let matches: bool = presented.as_bytes().ct_eq(decrypted.as_bytes()).into();
        if !matches {
            tracing::warn!("⚠️ Refresh token replay rejected for user {}", user.id);
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Issues a new pair for `user` and stores its refresh-token ciphertext.
    pub async fn issue_session(&self, mut user: User) -> Result<TokenPair> {
        let pair = self.generate_token_pair(&user)?;
        user.refresh_token = Some(pair.encrypted_refresh_token.clone());

        let saved = self
            .users
            .save(&user)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished while saving", user.id)))?;

        if saved.refresh_token.as_deref() != Some(pair.encrypted_refresh_token.as_str()) {
            return Err(AppError::Internal("Refresh token was not stored".to_string()));
        }

        tracing::debug!("🔑 Session issued for user {}", saved.id);
        Ok(pair)
    }

    /// Verifies `presented` and replaces it with a new pair.
    ///
    /// Banned users get `Forbidden` and keep no new session.
    pub async fn rotate_refresh_token(&self, presented: &str) -> Result<(User, TokenPair)> {
        let user = self.verify_refresh_token(presented).await?;
        if user.is_banned() {
            return Err(AppError::Forbidden("User is banned".to_string()));
        }

        let pair = self.issue_session(user.clone()).await?;
        Ok((user, pair))
    }

    /// Clears the stored refresh token so no refresh token of `user` verifies.
    pub async fn revoke(&self, mut user: User) -> Result<()> {
        user.refresh_token = None;

        let saved = self
            .users
            .save(&user)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished while saving", user.id)))?;

        if saved.refresh_token.is_some() {
            return Err(AppError::Internal("Refresh token was not cleared".to_string()));
        }

        tracing::debug!("🔒 Refresh token revoked for user {}", saved.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::testing::{self, MemoryUserStore};
    use chrono::{Duration, Utc};

    fn tamper(token: &str) -> String {
        let signature_start = token.rfind('.').unwrap() + 1;
        let mut chars: Vec<char> = token.chars().collect();
        chars[signature_start] = if chars[signature_start] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn tokens_verify_with_their_own_secret_only() {
        let service = testing::token_service(MemoryUserStore::new());
        let user = testing::user("alice", "a@x.com", Role::Admin);

        let access = service.create_token(&user, TokenKind::Access).unwrap();
        let refresh = service.create_token(&user, TokenKind::Refresh).unwrap();

        let claims = service.verify_token(&access, TokenKind::Access).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, Role::Admin);
        assert!(service.verify_token(&refresh, TokenKind::Refresh).is_ok());

        assert!(matches!(
            service.verify_token(&access, TokenKind::Refresh),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.verify_token(&refresh, TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expiry_follows_the_kind() {
        let service = testing::token_service(MemoryUserStore::new());
        let user = testing::user("alice", "a@x.com", Role::User);

        let access = service.create_token(&user, TokenKind::Access).unwrap();
        let refresh = service.create_token(&user, TokenKind::Refresh).unwrap();
        let access = service.verify_token(&access, TokenKind::Access).unwrap();
        let refresh = service.verify_token(&refresh, TokenKind::Refresh).unwrap();

        assert_eq!(access.exp - access.iat, 24 * 3600);
        assert_eq!(refresh.exp - refresh.iat, 72 * 3600);
    }

    #[test]
    fn expired_and_malformed_tokens_are_rejected() {
        let service = testing::token_service(MemoryUserStore::new());
        let user = testing::user("alice", "a@x.com", Role::User);

        let mut claims = Claims::for_user(&user, TokenKind::Access);
        claims.iat = (Utc::now() - Duration::hours(25)).timestamp();
        claims.exp = (Utc::now() - Duration::hours(1)).timestamp();
        let expired = service.sign(&claims, TokenKind::Access).unwrap();

        assert!(matches!(
            service.verify_token(&expired, TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.verify_token("not.a.jwt", TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn pair_stores_only_ciphertext() {
        let service = testing::token_service(MemoryUserStore::new());
        let user = testing::user("alice", "a@x.com", Role::User);

        let pair = service.generate_token_pair(&user).unwrap();

        assert_ne!(pair.encrypted_refresh_token, pair.refresh_token);
        assert_eq!(
            testing::cipher().decrypt(&pair.encrypted_refresh_token).unwrap(),
            pair.refresh_token
        );
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn stored_refresh_token_verifies() {
        let store = MemoryUserStore::new();
        let user = store.insert(testing::user("alice", "a@x.com", Role::User));
        let service = testing::token_service(store.clone());

        let pair = service.issue_session(user.clone()).await.unwrap();
        let verified = service.verify_refresh_token(&pair.refresh_token).await.unwrap();

        assert_eq!(verified.id, user.id);
        assert_eq!(
            store.get(user.id).unwrap().refresh_token,
            Some(pair.encrypted_refresh_token)
        );
    }

    #[tokio::test]
    async fn tampered_refresh_token_fails() {
        let store = MemoryUserStore::new();
        let user = store.insert(testing::user("alice", "a@x.com", Role::User));
        let service = testing::token_service(store);

        let pair = service.issue_session(user).await.unwrap();

        assert!(matches!(
            service.verify_refresh_token(&tamper(&pair.refresh_token)).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn rotated_out_token_is_rejected_despite_valid_signature() {
        let store = MemoryUserStore::new();
        let user = store.insert(testing::user("alice", "a@x.com", Role::User));
        let service = testing::token_service(store);

        let first = service.issue_session(user).await.unwrap();
        let (_, second) = service.rotate_refresh_token(&first.refresh_token).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(service.verify_token(&first.refresh_token, TokenKind::Refresh).is_ok());
        assert!(matches!(
            service.verify_refresh_token(&first.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
        assert!(service.verify_refresh_token(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let store = MemoryUserStore::new();
        let user = store.insert(testing::user("alice", "a@x.com", Role::User));
        let user_id = user.id;
        let service = testing::token_service(store.clone());

        let pair = service.issue_session(user).await.unwrap();
        let user = service.verify_refresh_token(&pair.refresh_token).await.unwrap();
        service.revoke(user).await.unwrap();

        assert!(store.get(user_id).unwrap().refresh_token.is_none());
        assert!(matches!(
            service.verify_refresh_token(&pair.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let service = testing::token_service(MemoryUserStore::new());
        let ghost = testing::user("ghost", "g@x.com", Role::User);
        let refresh = service.create_token(&ghost, TokenKind::Refresh).unwrap();

        assert!(matches!(
            service.verify_refresh_token(&refresh).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn unreadable_stored_ciphertext_is_rejected() {
        let store = MemoryUserStore::new();
        let mut user = testing::user("alice", "a@x.com", Role::User);
        user.refresh_token = Some("garbage".to_string());
        let user = store.insert(user);
        let service = testing::token_service(store);

        let refresh = service.create_token(&user, TokenKind::Refresh).unwrap();
        assert!(matches!(
            service.verify_refresh_token(&refresh).await,
            Err(AppError::Unauthorized)
        ));
    }
}
