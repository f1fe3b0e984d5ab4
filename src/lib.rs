//! Scholarship-application backend.
//!
//! Students register, keep their subject grades up to date and apply for
//! scholarship programs; administrators manage programs, review applications
//! and open grade-edit windows. Grade changes are gated per window and every
//! accepted change archives the previous grades first (see [`grade_edit`]).

pub mod admins;
pub mod api;
pub mod auth;
pub mod calc;
pub mod config;
pub mod db;
pub mod grade_edit;
pub mod ledger;
pub mod scholarships;
pub mod students;

use axum::Router;
use tokio::{net::TcpListener, signal};
use tracing::info;

use auth::TokenKeys;
use config::Config;

/// Opens the database, bootstraps the admin account and builds the router.
pub fn build_app(config: &Config) -> anyhow::Result<Router> {
    let conn = db::open_db(&config.data_dir)?;
    admins::ensure_bootstrap_admin(&conn, &config.admin_username, &config.admin_password)?;
    let tokens = TokenKeys::new(config.token_secret.as_bytes(), config.token_ttl_secs);
    Ok(api::router(api::AppState::new(conn, tokens)))
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    info!("Opening database in {}", config.data_dir.display());
    let app = build_app(&config)?;

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
