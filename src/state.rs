use std::sync::Arc;

use crate::{
    config::Config,
    crypto::{
        cipher::{AesGcmCipher, SymmetricCipher},
        password::{Argon2Hasher, PasswordHasher},
    },
    email::{EmailSender, SmtpEmailSender},
    error::Result,
    repositories::user::{PgUserStore, UserStore},
    services::{auth::AuthService, tokens::TokenService, users::UserAdminService},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Issues and verifies tokens.
    pub tokens: Arc<TokenService>,
    /// Registration and session commands.
    pub auth: Arc<AuthService>,
    /// Administrative user commands.
    pub admin: Arc<UserAdminService>,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL and SMTP.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url, config.database_pool_size)?;
        tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");

        crate::db::ensure_schema(&db).await?;
        tracing::info!("✅ Database schema is up to date");

        let cipher = AesGcmCipher::new(config.refresh_token_key.as_slice())?;
        let hasher = Argon2Hasher::new()?;

        let mailer = SmtpEmailSender::new(&config.smtp)?;
        tracing::info!("✅ SMTP transport configured for {}", config.smtp.host);

        Ok(Self::from_parts(
            config.clone(),
            Arc::new(PgUserStore::new(db)),
            Arc::new(hasher),
            Arc::new(cipher),
            Arc::new(mailer),
        ))
    }

    /// Wires the services together from their collaborators.
    pub fn from_parts(
        config: Config,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        cipher: Arc<dyn SymmetricCipher>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(
            config.jwt_access_secret.as_bytes(),
            config.jwt_refresh_secret.as_bytes(),
            cipher,
            users.clone(),
        ));

        let auth = Arc::new(AuthService::new(
            users.clone(),
            hasher.clone(),
            mailer,
            tokens.clone(),
            config.confirmation_url.clone(),
        ));

        let admin = Arc::new(UserAdminService::new(users, hasher, tokens.clone()));

        Self {
            config,
            tokens,
            auth,
            admin,
        }
    }
}
