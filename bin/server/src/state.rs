//! Shared application state.

use crate::config::Environment;
use axum::extract::FromRef;
use octolink_accounts::AccountService;
use octolink_guard::AccessGuard;
use std::sync::Arc;

/// Services shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub guard: Arc<AccessGuard>,
    pub environment: Environment,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(accounts: AccountService, guard: AccessGuard, environment: Environment) -> Self {
        Self {
            accounts: Arc::new(accounts),
            guard: Arc::new(guard),
            environment,
        }
    }
}

impl FromRef<AppState> for Environment {
    fn from_ref(state: &AppState) -> Self {
        state.environment
    }
}
