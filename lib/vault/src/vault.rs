//! The token vault: scrypt key derivation and AES-256 in counter mode.
//!
//! The scheme is unauthenticated. A tampered ciphertext, or one opened with
//! the wrong IV, decrypts to garbage instead of failing. The KDF salt is a
//! fixed literal so existing records stay readable.

use crate::error::VaultError;
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use rootcause::prelude::Report;
use std::fmt;
use tracing::debug;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Length of the per-record initialization vector, in bytes.
pub const IV_LEN: usize = 16;

/// Length of the derived AES-256 key, in bytes.
pub const KEY_LEN: usize = 32;

const KDF_SALT: &[u8] = b"salt";

// scrypt cost N = 2^14, r = 8, p = 1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Ciphertext of a secret together with the IV it was sealed under.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret {
    /// The ciphertext, same length as the plaintext's UTF-8 bytes.
    pub value: Vec<u8>,
    /// The random IV drawn for this seal.
    pub iv: [u8; IV_LEN],
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedSecret")
            .field("value_len", &self.value.len())
            .finish_non_exhaustive()
    }
}

/// Seals and opens secrets with a key derived from the server passphrase.
///
/// The key is derived once, when the vault is built. Building the vault is
/// CPU-bound, so do it at startup and share the vault behind an `Arc`.
#[derive(Clone)]
pub struct TokenVault {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    /// Builds a vault, deriving the key from `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MissingPassphrase`] if the passphrase is empty.
    pub fn new(passphrase: &str) -> Result<Self, Report<VaultError>> {
        if passphrase.is_empty() {
            return Err(VaultError::MissingPassphrase.into());
        }

        let key = derive_key(passphrase.as_bytes())?;
        debug!("derived vault key");
        Ok(Self { key })
    }

    /// Encrypts `plaintext` under a freshly drawn random IV.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> SealedSecret {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let mut value = plaintext.as_bytes().to_vec();
        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut value);

        SealedSecret { value, iv }
    }

    /// Decrypts `ciphertext` with the IV it was sealed under.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
    /// wrong IV yields a different string instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidIv`] if `iv` is not [`IV_LEN`] bytes.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> Result<String, Report<VaultError>> {
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| VaultError::InvalidIv {
            expected: IV_LEN,
            actual: iv.len(),
        })?;

        let mut plaintext = ciphertext.to_vec();
        let mut cipher = Aes256Ctr::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(&mut plaintext);

        Ok(String::from_utf8_lossy(&plaintext).into_owned())
    }
}

fn derive_key(passphrase: &[u8]) -> Result<[u8; KEY_LEN], VaultError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN).map_err(|e| {
        VaultError::KeyDerivation {
            reason: e.to_string(),
        }
    })?;

    let mut key = [0u8; KEY_LEN];
    scrypt::scrypt(passphrase, KDF_SALT, &params, &mut key).map_err(|e| {
        VaultError::KeyDerivation {
            reason: e.to_string(),
        }
    })?;
    Ok(key)
}
