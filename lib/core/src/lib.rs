//! Core domain types shared by the octolink crates.
//!
//! Identifiers for users and for the secrets stored on their behalf.

pub mod id;

pub use id::{ParseIdError, SecretId, UserId};
