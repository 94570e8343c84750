use appdock::api::{ApiServer, SiteSettings};
use appdock::auth::AdminCredentials;
use appdock::config::Config;
use appdock::db::Database;
use appdock::session::{SessionConfig, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("appdock=debug".parse().expect("valid log directive")),
        )
        .init();

    // Load configuration; a missing required value halts startup here.
    let config = Config::load().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    print_startup_banner(&config);

    // Open the catalog store, creating the schema if absent
    let db = Arc::new(Database::open(&config.database_path)?);

    // Session store, keyed by the configured signing secret
    let sessions = Arc::new(SessionStore::new(SessionConfig {
        secret: config.session_secret.clone(),
        ttl_hours: config.session_ttl_hours,
        ..SessionConfig::default()
    }));

    let credentials = AdminCredentials {
        username: config.admin_username.clone(),
        password: config.admin_password.clone(),
    };

    let site = SiteSettings {
        company_name: config.company_name.clone(),
        company_icon: config.company_icon.clone(),
    };

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| {
            error!(bind = %config.bind, port = config.port, error = %e, "Invalid bind address");
            anyhow::anyhow!("Invalid bind address: {}", e)
        })?;

    let server = Arc::new(
        ApiServer::bind(addr, db, sessions, credentials, site, shutdown_rx).await?,
    );

    let server_handle = tokio::spawn({
        let server = Arc::clone(&server);
        async move {
            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
            }
        }
    });

    // Wait for shutdown signal (Ctrl+C or SIGTERM)
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C), shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down...");
    }

    // Signal shutdown and wait for the accept loop to drain (with timeout)
    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(5), server_handle).await;

    info!("Shutdown complete");
    Ok(())
}

fn print_startup_banner(config: &Config) {
    info!(name = PKG_NAME, version = VERSION, "Starting catalog server");
    info!(
        bind = %config.bind,
        port = config.port,
        database = %config.database_path,
        "Server configuration"
    );
    info!(
        company = %config.company_name,
        session_ttl_hours = config.session_ttl_hours,
        "Site settings"
    );
}
