//! Web server hosting the interactive shell
//!
//! Serves the HTML form, keeps one session per browser, and exposes the
//! same pipeline as a small JSON API.

mod error;
mod handlers;
mod page;
mod routes;
mod state;

pub use error::ApiError;
pub use page::render_page;
pub use routes::create_router;
pub use state::{AppState, Session};

use crate::dataset::DEFAULT_PREVIEW_ROWS;
use crate::graph::DEFAULT_EDGE_SLOTS;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// How often idle sessions are swept
const SWEEP_INTERVAL_SECS: u64 = 60;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Number of edge slots in the form (default: 3)
    pub edge_slots: usize,
    /// Rows shown in the data preview (default: 5)
    pub preview_rows: usize,
    /// Maximum number of live sessions (default: 64)
    pub max_sessions: usize,
    /// Maximum request body size in bytes (default: 16 MiB)
    pub max_upload_bytes: usize,
    /// Idle time after which a session and its dataset are dropped (default: 30 min)
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            edge_slots: DEFAULT_EDGE_SLOTS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_sessions: 64,
            max_upload_bytes: 16 * 1024 * 1024,
            session_ttl: Duration::minutes(30),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration with default limits
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            ..ServerConfig::default()
        }
    }
}

/// Runs the server
///
/// # Example
/// ```rust,no_run
/// use causaliq::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run_server(ServerConfig::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config));
    tokio::spawn(sweep_sessions(state.clone()));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drops idle sessions so abandoned datasets are released
async fn sweep_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
    loop {
        interval.tick().await;
        state.expire_sessions(Utc::now()).await;
    }
}
