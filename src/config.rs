use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::cipher::KEY_SIZE;

/// SMTP settings for outgoing mail.
#[derive(Clone)]
pub struct SmtpConfig {
    /// The SMTP relay host.
    pub host: String,
    /// The SMTP submission port.
    pub port: u16,
    /// The SMTP login.
    pub username: String,
    /// The SMTP password.
    pub password: Zeroizing<String>,
    /// The mailbox mail is sent from.
    pub from: String,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The maximum number of pooled database connections.
    pub database_pool_size: usize,
    /// The secret used to sign access tokens.
    pub jwt_access_secret: Zeroizing<String>,
    /// The secret used to sign refresh tokens.
    pub jwt_refresh_secret: Zeroizing<String>,
    /// The AES-256 key used to encrypt stored refresh tokens.
    pub refresh_token_key: Zeroizing<Vec<u8>>,
    /// Outgoing mail settings.
    pub smtp: SmtpConfig,
    /// The page that receives the confirmation code as `?code=`.
    pub confirmation_url: String,
    /// The origin allowed by CORS.
    pub cors_origin: String,
    /// The address the server listens on.
    pub bind_addr: SocketAddr,
    /// Whether cookies are marked `Secure`.
    pub secure_cookies: bool,
}

/// Reads a secret that must be present and non-empty.
fn required_secret(name: &str) -> Result<Zeroizing<String>> {
    let value = Zeroizing::new(env::var(name).with_context(|| format!("{} must be set", name))?);
    if value.trim().is_empty() {
        anyhow::bail!("{} must not be empty", name);
    }
    Ok(value)
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_access_secret = required_secret("JWT_ACCESS_SECRET")?;
        let jwt_refresh_secret = required_secret("JWT_REFRESH_SECRET")?;
        if *jwt_access_secret == *jwt_refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let mut refresh_key_hex = env::var("REFRESH_TOKEN_KEY")
            .context("REFRESH_TOKEN_KEY must be set (generate with: openssl rand -hex 32)")?;

        let refresh_key_bytes = hex::decode(&refresh_key_hex)
            .context("REFRESH_TOKEN_KEY must be valid hexadecimal")?;

        refresh_key_hex.zeroize();

        if refresh_key_bytes.len() != KEY_SIZE {
            anyhow::bail!("REFRESH_TOKEN_KEY must be exactly 32 bytes (64 hex characters)");
        }

        let smtp = SmtpConfig {
            host: env::var("SMTP_HOST").context("SMTP_HOST must be set")?,
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            username: env::var("SMTP_USERNAME").context("SMTP_USERNAME must be set")?,
            password: Zeroizing::new(
                env::var("SMTP_PASSWORD").context("SMTP_PASSWORD must be set")?,
            ),
            from: env::var("MAIL_FROM").context("MAIL_FROM must be set")?,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            database_pool_size: env::var("DATABASE_POOL_SIZE")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .context("Invalid DATABASE_POOL_SIZE")?,
            jwt_access_secret,
            jwt_refresh_secret,
            refresh_token_key: Zeroizing::new(refresh_key_bytes),
            smtp,
            confirmation_url: env::var("CONFIRMATION_URL")
                .context("CONFIRMATION_URL must be set")?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            secure_cookies: env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string()) == "production",
        })
    }
}
