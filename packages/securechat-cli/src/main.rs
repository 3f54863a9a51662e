//! SecureChat terminal client.
//!
//! Generates a fresh identity, publishes its public keys, joins a room and
//! then sends every stdin line to one peer. Everything received is printed
//! as it arrives.
//!
//! ```bash
//! securechat --user alice --peer bob
//! securechat --user bob --peer alice --server http://relay.example.com:8000
//! ```
//!
//! Lines starting with `/` are commands: `/peers` lists principals seen in
//! the room, `/quit` leaves.

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};

use securechat_core::{
    ClientConfig, HttpDirectory, Identity, Messenger, RelaySession, VerificationPolicy,
    WsTransport,
};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "securechat", version, about = "End-to-end encrypted room chat")]
struct Args {
    /// Our principal name
    #[arg(short, long, env = "SECURECHAT_USER")]
    user: String,

    /// Principal to send messages to
    #[arg(short, long, env = "SECURECHAT_PEER")]
    peer: String,

    /// Relay room to join
    #[arg(short, long, default_value = securechat_core::config::DEFAULT_ROOM, env = "SECURECHAT_ROOM")]
    room: String,

    /// Server base URL (directory and relay)
    #[arg(short, long, default_value = securechat_core::config::DEFAULT_SERVER_URL, env = "SECURECHAT_SERVER")]
    server: String,

    /// Directory lookup timeout in seconds
    #[arg(long, default_value_t = securechat_core::config::DEFAULT_RESOLVE_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Drop messages whose signature does not verify instead of showing them
    #[arg(long)]
    reject_unverified: bool,
}

impl Args {
    fn client_config(&self) -> color_eyre::Result<ClientConfig> {
        let config = ClientConfig {
            server_url: self.server.clone(),
            room: self.room.clone(),
            resolve_timeout_secs: self.timeout_secs,
            verification_policy: if self.reject_unverified {
                VerificationPolicy::Reject
            } else {
                VerificationPolicy::Deliver
            },
            ..ClientConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "securechat=info,securechat_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.client_config()?;

    // RSA key generation blocks for a noticeable moment
    let name = args.user.clone();
    let bits = config.encryption_key_bits;
    let identity = tokio::task::spawn_blocking(move || Identity::generate_with_bits(name, bits))
        .await
        .map_err(|e| eyre!("key generation task failed: {}", e))??;

    let directory = Arc::new(HttpDirectory::new(
        config.directory_url(),
        config.resolve_timeout(),
    )?);
    let session = Arc::new(RelaySession::new(Arc::new(WsTransport::new(
        config.relay_url(),
    ))));
    let messenger = Arc::new(Messenger::new(identity, directory, session, config));

    messenger
        .publish_keys()
        .await
        .wrap_err("Failed to publish public keys")?;
    messenger
        .join()
        .await
        .wrap_err_with(|| format!("Failed to join room '{}'", args.room))?;
    println!(
        "Joined '{}' as {}. Type a message for {}, /peers or /quit.",
        args.room, args.user, args.peer
    );

    let receiver = tokio::spawn(receive_loop(messenger.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/peers" => println!("peers: {}", messenger.peers().join(", ")),
            text => {
                if let Err(e) = messenger.send(&args.peer, text.as_bytes()).await {
                    if e.is_recoverable() {
                        eprintln!("not sent: {}", e);
                    } else {
                        eprintln!("error: {}", e);
                    }
                }
            }
        }
    }

    messenger.close();
    let _ = receiver.await;
    Ok(())
}

/// Print every outcome until the session closes.
async fn receive_loop(messenger: Arc<Messenger>) {
    loop {
        match messenger.next_outcomes().await {
            Ok(Some(outcomes)) => {
                for outcome in outcomes {
                    println!("{}", outcome);
                }
            }
            Ok(None) => {
                println!("connection closed");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not process incoming message");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
