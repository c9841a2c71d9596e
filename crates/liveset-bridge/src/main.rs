//! Bridge entry point.
//!
//! Wires the simulated transport, the tick pump and the command surface
//! together. Bind address and sim tick period come from the environment:
//!
//! - `LIVESET_BIND`   - listen address, default `127.0.0.1:3001`
//! - `LIVESET_TICK_MS` - sim playhead update period, default `50`

use std::net::SocketAddr;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use liveset_bridge::{pump, routes, AppState, SimTransport, TransportLink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let transport = SimTransport::new();
    transport.start().await?;

    let app = AppState::new(transport.clone());

    tokio::spawn(pump::run(app.clone()));

    let tick_ms: u64 = std::env::var("LIVESET_TICK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);
    tokio::spawn(transport.drive(Duration::from_millis(tick_ms)));

    let addr: SocketAddr = std::env::var("LIVESET_BIND")
        .unwrap_or_else(|_| "127.0.0.1:3001".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("liveset bridge listening on http://{addr}");

    axum::serve(listener, routes::router(app)).await?;
    Ok(())
}
