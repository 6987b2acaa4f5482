//! In-memory doubles and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{
    config::{Config, SmtpConfig},
    crypto::{
        cipher::{AesGcmCipher, KEY_SIZE},
        password::{Argon2Hasher, PasswordHasher},
    },
    email::EmailSender,
    error::{AppError, Result},
    models::{
        email_confirmation::EmailConfirmation,
        user::{BanState, NewUser, Role, User},
    },
    repositories::user::UserStore,
    services::tokens::TokenService,
};

pub const ACCESS_SECRET: &[u8] = b"test-access-secret";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret";
pub const CIPHER_KEY: [u8; KEY_SIZE] = [42u8; KEY_SIZE];

/// A user with a confirmed email and no stored session.
pub fn user(login: &str, email: &str, role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        login: login.to_string(),
        email: email.to_string(),
        password: "$argon2id$placeholder".to_string(),
        role,
        refresh_token: None,
        ban: None,
        email_confirmation: Some(EmailConfirmation::confirmed(id)),
        created_at: Utc::now(),
    }
}

pub fn cipher() -> AesGcmCipher {
    AesGcmCipher::new(&CIPHER_KEY).unwrap()
}

/// Argon2 with the smallest accepted costs so tests stay fast.
pub fn hasher() -> Argon2Hasher {
    Argon2Hasher::with_params(1024, 1, 1).unwrap()
}

/// A [`PasswordHasher`] over the fast test Argon2 that counts verifications.
#[derive(Clone)]
pub struct CountingHasher {
    inner: Argon2Hasher,
    verifications: Arc<AtomicUsize>,
}

impl CountingHasher {
    pub fn new() -> Self {
        Self {
            inner: hasher(),
            verifications: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasswordHasher for CountingHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        self.inner.hash(password).await
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(password, hash).await
    }
}

pub fn token_service(store: MemoryUserStore) -> TokenService {
    TokenService::new(
        ACCESS_SECRET,
        REFRESH_SECRET,
        Arc::new(cipher()),
        Arc::new(store),
    )
}

pub fn config() -> Config {
    Config {
        database_url: "postgres://localhost/irisart_test".to_string(),
        database_pool_size: 1,
        jwt_access_secret: Zeroizing::new(String::from_utf8_lossy(ACCESS_SECRET).into_owned()),
        jwt_refresh_secret: Zeroizing::new(String::from_utf8_lossy(REFRESH_SECRET).into_owned()),
        refresh_token_key: Zeroizing::new(CIPHER_KEY.to_vec()),
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: "mailer".to_string(),
            password: Zeroizing::new("secret".to_string()),
            from: "IRISART <noreply@irisart.example>".to_string(),
        },
        confirmation_url: "https://irisart.example/confirm".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        secure_cookies: false,
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
}

/// A [`UserStore`] kept in a map. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    tables: Arc<RwLock<Tables>>,
    failing: Arc<AtomicBool>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `user` into the store as-is and returns it.
    pub fn insert(&self, user: User) -> User {
        self.tables.write().users.insert(user.id, user.clone());
        user
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.tables.read().users.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tables.read().users.len()
    }

    /// Makes `create` fail as if the database were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_login_or_email(&self, key: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|user| user.login == key || user.email == key)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.get(id))
    }

    async fn save(&self, user: &User) -> Result<Option<User>> {
        let mut tables = self.tables.write();
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(None);
        };
        stored.login = user.login.clone();
        stored.email = user.email.clone();
        stored.password = user.password.clone();
        stored.role = user.role;
        stored.refresh_token = user.refresh_token.clone();
        Ok(Some(stored.clone()))
    }

    async fn create(&self, user: NewUser, confirmation: EmailConfirmation) -> Result<Uuid> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection reset".to_string()));
        }

        let mut tables = self.tables.write();
        if tables.users.values().any(|existing| existing.login == user.login) {
            return Err(AppError::Conflict("User with this login already exists".to_string()));
        }
        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }
        tables.users.insert(
            user.id,
            User {
                id: user.id,
                login: user.login,
                email: user.email,
                password: user.password,
                role: user.role,
                refresh_token: None,
                ban: None,
                email_confirmation: Some(confirmation),
                created_at: Utc::now(),
            },
        );
        Ok(user.id)
    }

    async fn get_banned_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.get(id).filter(User::is_banned))
    }

    async fn list_banned(&self) -> Result<Vec<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .filter(|user| user.is_banned())
            .cloned()
            .collect())
    }

    async fn ban(&self, id: Uuid, reason: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(false);
        };
        user.ban = Some(BanState {
            is_banned: true,
            reason: Some(reason.to_string()),
            banned_at: Some(Utc::now()),
        });
        Ok(true)
    }

    async fn unban(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.users.get_mut(&id) {
            Some(user) if user.is_banned() => {
                user.ban = Some(BanState {
                    is_banned: false,
                    reason: None,
                    banned_at: None,
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_confirmation_by_code(&self, code: Uuid) -> Result<Option<EmailConfirmation>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .filter_map(|user| user.email_confirmation.clone())
            .find(|confirmation| confirmation.confirmation_code == code))
    }

    async fn update_confirmation(&self, confirmation: &EmailConfirmation) -> Result<bool> {
        let mut tables = self.tables.write();
        match tables.users.get_mut(&confirmation.user_id) {
            Some(user) if user.email_confirmation.is_some() => {
                user.email_confirmation = Some(confirmation.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A sent message recorded by [`MemoryMailer`].
#[derive(Clone, Debug)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// An [`EmailSender`] that records messages, or fails on demand.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<RwLock<Vec<SentEmail>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl EmailSender for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Email("SMTP relay unavailable".to_string()));
        }
        self.sent.write().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Pulls the confirmation code out of a registration email body.
pub fn code_from_email(email: &SentEmail) -> Uuid {
    let start = email.html_body.find("code=").unwrap() + "code=".len();
    Uuid::parse_str(&email.html_body[start..start + 36]).unwrap()
}
