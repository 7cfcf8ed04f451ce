use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sendit_core::{
    create_audit_system, create_mailer, load_config, validate_config, AuditEvent, AuditStore,
    DistanceOracle, GoogleDirectionsClient, ShipmentStore, SqliteAuditStore,
    SqliteShipmentStore, SqliteUserStore, UserStore,
};
use sendit_server::api::create_router;
use sendit_server::state::{AppState, Collaborators, Stores};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

/// How often expired sessions are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SENDIT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Stores share one SQLite file
    let users: Arc<dyn UserStore> = Arc::new(
        SqliteUserStore::new(&config.database.path).context("Failed to create user store")?,
    );
    let shipments: Arc<dyn ShipmentStore> = Arc::new(
        SqliteShipmentStore::new(&config.database.path)
            .context("Failed to create shipment store")?,
    );
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Stores initialized");

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let oracle: Option<Arc<dyn DistanceOracle>> = match &config.directions {
        Some(directions_config) => {
            info!("Initializing directions client at {}", directions_config.base_url);
            Some(Arc::new(
                GoogleDirectionsClient::new(directions_config)
                    .context("Failed to create directions client")?,
            ))
        }
        None => {
            warn!("No directions provider configured; quotes will be unavailable");
            None
        }
    };

    let mailer =
        create_mailer(config.mailer.as_ref()).context("Failed to create mailer")?;
    info!("Using mailer: {}", mailer.name());

    let state = Arc::new(
        AppState::new(
            config.clone(),
            Stores {
                users,
                shipments,
                audit: audit_store,
            },
            Collaborators { oracle, mailer },
            audit_handle.clone(),
        )
        .context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", state.authenticator().method_name());

    let purge_task = tokio::spawn(purge_sessions(Arc::clone(&state)));

    let app = create_router(Arc::clone(&state));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    purge_task.abort();
    let _ = purge_task.await;

    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Every service holds an AuditHandle clone; the writer stops once all are gone.
    drop(state);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Drop expired sessions periodically.
async fn purge_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        match state.accounts().purge_expired_sessions() {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Purged expired sessions"),
            Err(e) => warn!("Failed to purge expired sessions: {}", e),
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
