//! Encryption at rest for third-party access tokens.
//!
//! A [`TokenVault`] turns a plaintext secret into a [`SealedSecret`]
//! (ciphertext plus the IV used) and back. The key is derived from a
//! server-held passphrase; every seal draws a fresh random IV.
//!
//! # Example
//!
//! ```
//! use octolink_vault::TokenVault;
//!
//! let vault = TokenVault::new("correct horse battery staple").expect("passphrase is set");
//! let sealed = vault.encrypt("ghp_abc");
//! let opened = vault.decrypt(&sealed.value, &sealed.iv).expect("iv is 16 bytes");
//! assert_eq!(opened, "ghp_abc");
//! ```

mod error;
mod vault;

pub use error::VaultError;
pub use vault::{IV_LEN, KEY_LEN, SealedSecret, TokenVault};
