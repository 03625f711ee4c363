use octolink_accounts::AccountService;
use octolink_github::{GithubClient, GithubOAuthApp};
use octolink_guard::{AccessGuard, GuardConfig};
use octolink_server::{
    config::ServerConfig, db::PgAccountStore, error::StartupError, firebase::FirebaseVerifier,
    router, state::AppState,
};
use octolink_vault::TokenVault;
use rootcause::prelude::Report;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<StartupError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().map_err(|e| StartupError::Configuration {
        details: e.to_string(),
    })?;
    config.validate()?;
    tracing::info!(environment = ?config.environment, "Loaded configuration");

    // scrypt runs once here, not per request.
    let vault = TokenVault::new(&config.secret_key).map_err(|e| StartupError::Vault {
        details: e.to_string(),
    })?;

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to connect: {e}"),
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| StartupError::Database {
            details: format!("failed to run migrations: {e}"),
        })?;

    let github = GithubClient::new(config.github.api_base_url.clone()).map_err(|e| {
        StartupError::Client {
            details: e.to_string(),
        }
    })?;

    let mut accounts = AccountService::new(
        Arc::new(PgAccountStore::new(db_pool)),
        Arc::new(vault),
        Arc::new(github),
    );
    match config.github.oauth_app() {
        Some((client_id, client_secret)) => {
            let app = GithubOAuthApp::new(client_id, client_secret, config.github.token_url.clone())
                .map_err(|e| StartupError::Client {
                    details: e.to_string(),
                })?;
            accounts = accounts.with_code_exchanger(Arc::new(app));
        }
        None => tracing::warn!("GitHub OAuth app not configured; code linking is disabled"),
    }

    let verifier = FirebaseVerifier::new(&config.firebase)?;
    let guard = AccessGuard::new(GuardConfig::new(
        config.client.credential(),
        Arc::new(verifier),
        config.guard.verification_timeout(),
    ));

    let app = router(AppState::new(accounts, guard, config.environment));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Serve {
            details: format!("failed to bind to {}: {e}", config.bind_addr),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            details: e.to_string(),
        })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
