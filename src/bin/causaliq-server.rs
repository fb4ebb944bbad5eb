//! CausalIQ Server Binary
//!
//! Run with: `cargo run --bin causaliq-server`

use causaliq::{run_server, ServerConfig};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Note: Tracing is initialized in run_server()
    // Set RUST_LOG environment variable to control log level:
    //   RUST_LOG=debug cargo run --bin causaliq-server
    //   RUST_LOG=causaliq::causal=debug cargo run --bin causaliq-server  (engine only)

    let defaults = ServerConfig::default();
    let host = std::env::var("HOST").unwrap_or(defaults.host.clone());
    let port = env_or("PORT", defaults.port);

    let config = ServerConfig {
        edge_slots: env_or("EDGE_SLOTS", defaults.edge_slots).max(1),
        max_sessions: env_or("MAX_SESSIONS", defaults.max_sessions),
        session_ttl: chrono::Duration::minutes(
            env_or("SESSION_TTL_MINUTES", defaults.session_ttl.num_minutes()).clamp(1, 7 * 24 * 60),
        ),
        ..ServerConfig::new(host, port)
    };

    println!("Starting CausalIQ server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Edge slots: {}", config.edge_slots);
    println!("   Session TTL: {} min", config.session_ttl.num_minutes());
    println!();
    println!(
        "Open http://{}:{}/ in a browser to start a session",
        config.host, config.port
    );
    println!();
    println!("Available endpoints:");
    println!("  GET    /                             - New session (redirect)");
    println!("  GET    /sessions/:id                 - Session page");
    println!("  POST   /sessions/:id                 - Submit form");
    println!("  POST   /sessions/:id/dataset         - Upload CSV (multipart)");
    println!("  DELETE /sessions/:id                 - End session");
    println!("  POST   /api/sessions                 - Create session (JSON)");
    println!("  PUT    /api/sessions/:id/dataset     - Upload CSV body");
    println!("  POST   /api/sessions/:id/view        - Evaluate form (JSON)");
    println!("  GET    /health                       - Health check");
    println!();

    run_server(config).await?;

    Ok(())
}
