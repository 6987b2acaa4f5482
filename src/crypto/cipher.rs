use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use aes_gcm::aead::rand_core::RngCore;
use base64::{Engine as _, engine::general_purpose};
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Encrypts strings before they are stored and decrypts them on the way back.
///
/// `decrypt(encrypt(s)) == s` for every `s`; callers compare decrypted values
/// for exact equality.
pub trait SymmetricCipher: Send + Sync {
    /// Encrypts `plaintext` into a storable text form.
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    /// Decrypts a value produced by [`SymmetricCipher::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecureKey([u8; KEY_SIZE]);

/// AES-256-GCM with a random nonce per message.
///
/// The stored form is `base64(nonce || ciphertext)`.
pub struct AesGcmCipher {
    key: SecureKey,
}

impl AesGcmCipher {
    /// Creates a new `AesGcmCipher` from raw key bytes.
    ///
    /// # Arguments
    ///
    /// * `key` - Exactly 32 bytes of key material.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = key
            .try_into()
            .map_err(|_| AppError::Encryption("Invalid key size".to_string()))?;
        Ok(Self { key: SecureKey(key) })
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key.0)
            .map_err(|e| AppError::Encryption(format!("Invalid key: {}", e)))
    }
}

/// Generates a new random AES-GCM nonce.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

impl SymmetricCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes = generate_nonce();

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(general_purpose::STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let sealed = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| AppError::Encryption(format!("Invalid ciphertext encoding: {}", e)))?;

        if sealed.len() <= NONCE_SIZE {
            return Err(AppError::Encryption("Ciphertext too short".to_string()));
        }
        let (nonce, body) = sealed.split_at(NONCE_SIZE);

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Encryption(format!("Decrypted value is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> AesGcmCipher {
        AesGcmCipher::new(&[7u8; KEY_SIZE]).unwrap()
    }

    #[test]
    fn decrypt_reverses_encrypt() {
        let cipher = cipher();
        for plaintext in ["a", "eyJhbGciOiJIUzI1NiJ9.e30.sig", "ünïcødé ✓"] {
            let sealed = cipher.encrypt(plaintext).unwrap();
            assert_ne!(sealed, plaintext);
            assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn each_encryption_uses_a_fresh_nonce() {
        let cipher = cipher();
        let first = cipher.encrypt("token").unwrap();
        let second = cipher.encrypt("token").unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), cipher.decrypt(&second).unwrap());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = cipher();
        let sealed = cipher.encrypt("token").unwrap();
        let mut bytes = general_purpose::STANDARD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(bytes);

        assert!(matches!(cipher.decrypt(&tampered), Err(AppError::Encryption(_))));
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let sealed = cipher().encrypt("token").unwrap();
        let other = AesGcmCipher::new(&[8u8; KEY_SIZE]).unwrap();
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(AesGcmCipher::new(&[1u8; 16]).is_err());
        assert!(cipher().decrypt("not base64 !!").is_err());
        assert!(cipher().decrypt("AAAA").is_err());
    }
}
