//! User accounts for octolink.
//!
//! An account is keyed by the identity provider's subject and may have one
//! GitHub access token linked to it. The token is only ever stored sealed by
//! the [`TokenVault`](octolink_vault::TokenVault), and is re-validated with
//! GitHub each time it is read back.

mod error;
mod model;
mod service;
mod store;

pub use error::{AccountError, StoreError};
pub use model::{EncryptedSecret, NewUser, User, UserUpdate};
pub use service::AccountService;
pub use store::{AccountStore, MemoryAccountStore};
