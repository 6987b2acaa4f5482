use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2, ParamsBuilder,
};
use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// One-way hashing of credentials.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hashes `password` into a self-describing digest.
    async fn hash(&self, password: &str) -> Result<String>;
    /// Checks `password` against a digest produced by [`PasswordHasher::hash`].
    async fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Creates a hasher with explicit cost parameters.
    ///
    /// # Arguments
    ///
    /// * `memory_kib` - Memory cost in KiB.
    /// * `iterations` - Number of passes.
    /// * `parallelism` - Degree of parallelism.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(parallelism)
            .build()
            .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }

    /// Creates a hasher with the production cost parameters.
    pub fn new() -> Result<Self> {
        Self::with_params(
            ARGON2_MEMORY_MB * 1024,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
        )
    }

    fn hash_blocking(argon2: &Argon2<'static>, mut password: String) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Encryption(format!("Salt encoding error: {}", e)))?;

        let result = argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Encryption(format!("Argon2 hash error: {}", e)));

        password.zeroize();
        result
    }

    fn verify_blocking(argon2: &Argon2<'static>, mut password: String, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Encryption(format!("Hash parse error: {}", e)));

        let result = parsed_hash.map(|parsed| {
            argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        });

        password.zeroize();
        result
    }
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();

        let hash = tokio::task::spawn_blocking(move || Self::hash_blocking(&argon2, password))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))??;

        tracing::debug!("Password hashed successfully with Argon2");
        Ok(hash)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        let valid =
            tokio::task::spawn_blocking(move || Self::verify_blocking(&argon2, password, &hash))
                .await
                .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))??;

        tracing::debug!("Password verification completed");
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).await.unwrap());
        assert!(!hasher.verify("battery staple", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn salts_differ_between_hashes() {
        let hasher = hasher();
        let first = hasher.hash("pw1").await.unwrap();
        let second = hasher.hash("pw1").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let result = hasher().verify("pw", "not-a-phc-string").await;
        assert!(matches!(result, Err(AppError::Encryption(_))));
    }

    #[test]
    fn production_params_are_accepted() {
        assert!(Argon2Hasher::new().is_ok());
    }
}
