//! SecureChat Relay Server
//!
//! Serves the public key directory and the room WebSocket relay.

use clap::Parser;
use color_eyre::eyre::WrapErr;

use securechat_relay::{router, RelayConfig, RelayState};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "securechat-relay", version, about = "SecureChat relay and key directory")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000, env = "RELAY_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_BIND")]
    bind: String,

    /// Frames buffered per room before slow members start dropping frames
    #[arg(long, default_value_t = 256, env = "ROOM_CAPACITY")]
    room_capacity: usize,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "securechat_relay=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    if args.room_capacity == 0 {
        color_eyre::eyre::bail!("--room-capacity must be positive");
    }

    let config = RelayConfig {
        bind: args.bind,
        port: args.port,
        room_capacity: args.room_capacity,
    };
    let addr = config.listen_addr();
    let app = router(RelayState::new(config));

    tracing::info!("SecureChat relay starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await.wrap_err("Server error")?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
