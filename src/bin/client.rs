use std::io::{self, BufRead};

use clap::{Parser, Subcommand};
use dl_zkpp::client::{Authenticator, ClientConfig};
use dl_zkpp::{Secret, SecretEncoding};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "Zero-knowledge password proof client", long_about = None)]
#[command(version)]
struct Cli {
    /// Verifier base URL (overrides configuration)
    #[arg(short, long, env = "ZKPP_SERVER")]
    server: Option<String>,

    /// Derive the secret with Argon2 under this realm instead of char codes
    #[arg(long, env = "ZKPP_REALM")]
    argon2_realm: Option<String>,

    /// Abort after this many rounds (overrides configuration)
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Abort after this many invalid rounds (overrides configuration)
    #[arg(long)]
    max_invalid: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prove knowledge of a password to the verifier
    Login {
        /// Password; read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn read_password() -> io::Result<String> {
    eprintln!("Password:");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ClientConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        info!("Using default configuration");
        ClientConfig::default()
    });

    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(realm) = cli.argon2_realm {
        config.encoding = SecretEncoding::Argon2 { realm };
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.engine.max_rounds = max_rounds;
    }
    if let Some(max_invalid) = cli.max_invalid {
        config.engine.max_invalid = max_invalid;
    }

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;

    match cli.command {
        Commands::Login { password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let secret = Secret::from_password(&password, &config.encoding)?;
            drop(password);

            let authenticator = Authenticator::new(config.http_transport()?, config.engine)?;

            let mut ledger = authenticator.ledger();
            let progress = tokio::spawn(async move {
                while ledger.changed().await.is_ok() {
                    let snapshot = *ledger.borrow_and_update();
                    if snapshot.total_rounds() > 0 {
                        eprintln!(
                            "Invalid attempts: {} / {}",
                            snapshot.invalid_rounds(),
                            snapshot.total_rounds()
                        );
                    }
                }
            });

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C signal, cancelling");
                    on_ctrl_c.cancel();
                }
            });

            let result = authenticator.authenticate_with_cancel(secret, &cancel).await;
            drop(authenticator);
            progress.await.ok();

            match result {
                Ok(result) if result.authenticated => {
                    println!(
                        "Authenticated (session {}, {} rounds)",
                        result.session_id,
                        result.ledger.total_rounds()
                    );
                }
                Ok(result) => {
                    println!(
                        "Authentication refused ({} of {} rounds invalid)",
                        result.ledger.invalid_rounds(),
                        result.ledger.total_rounds()
                    );
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Authentication attempt failed: {e}");
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
