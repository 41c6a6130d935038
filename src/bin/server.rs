use std::time::Duration;

use actix_web::middleware::Condition;
use actix_web::{App, HttpServer, web};
use clap::Parser;
use dl_zkpp::server::{AppState, ServerConfig, ServerState, service};
use tokio::{signal, time};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Zero-knowledge password proof verifier", long_about = None)]
#[command(version)]
struct Args {
    /// Host to bind to (overrides configuration)
    #[arg(short = 'H', long, env = "ZKPP_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long, env = "ZKPP_PORT")]
    port: Option<u16>,

    /// Enable the Prometheus exporter
    #[arg(long, env = "ZKPP_METRICS")]
    metrics: bool,

    /// Valid rounds required to authenticate (overrides configuration)
    #[arg(long, env = "ZKPP_REQUIRED_ROUNDS")]
    required_rounds: Option<u32>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        info!("Using default configuration");
        ServerConfig::default()
    });

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.metrics {
        config.metrics.enabled = true;
    }
    if let Some(rounds) = args.required_rounds {
        config.policy.required_valid_rounds = rounds;
        config.policy.max_rounds = config.policy.max_rounds.max(rounds);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        return Err(format!("Invalid configuration: {e}").into());
    }

    let state = ServerState::from_config(&config)?;
    let limiter = config.rate_limit.build_limiter();

    let cleanup_state = state.clone();
    let cleanup_interval = Duration::from_secs(config.session.cleanup_interval_secs);
    tokio::spawn(async move {
        let mut interval = time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            let removed = cleanup_state.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "expired sessions swept");
            }
        }
    });

    if config.metrics.enabled {
        let metrics_addr = config.metrics.addr()?;
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
        {
            Ok(()) => info!("Metrics server started on {metrics_addr}"),
            Err(e) => error!("Failed to start metrics server: {e}"),
        }
    }

    let addr = config.addr()?;
    info!(
        %addr,
        required_valid_rounds = config.policy.required_valid_rounds,
        max_rounds = config.policy.max_rounds,
        rate_limit = config.rate_limit.requests_per_minute,
        burst = config.rate_limit.burst,
        cors = config.cors.enabled,
        "verifier starting"
    );

    let data = web::Data::new(AppState::new(state, limiter));
    let cors_settings = config.cors.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Condition::new(
                cors_settings.enabled,
                service::cors(&cors_settings),
            ))
            .app_data(data.clone())
            .configure(service::configure)
    })
    .disable_signals()
    .shutdown_timeout(2)
    .bind(addr)?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown (allowing in-flight requests to complete)");
        handle.stop(true).await;
    });

    server.await?;
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
