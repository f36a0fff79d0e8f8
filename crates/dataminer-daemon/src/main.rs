//! dataminer-daemon entry point.
//!
//! Thin by design: parses flags, initializes tracing, loads and validates
//! config, wires every enabled exchange's IP pool / HTTP client / adapter
//! / pairs cache / scheduler (or stream client), serves the peripheral
//! health-check router, and waits for a shutdown signal. All route
//! handlers and wiring logic live in the library target.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Notify;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use dataminer_config::AppConfig;
use dataminer_daemon::{routes, shutdown, state, wiring};
use dataminer_model::{FnSink, Record};

#[derive(Parser)]
#[command(name = "dataminer-daemon", about = "Cron-driven exchange market-data ingestion daemon", long_about = None, disable_version_flag = true, disable_help_flag = true)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "./config/config.yaml")]
    config: String,

    #[arg(long = "version")]
    version: bool,

    #[arg(long = "help")]
    help: bool,
}

/// 0 on normal shutdown; distinct non-zero codes for config-load
/// failure, config-validation failure, and system-initialization
/// failure.
const EXIT_CONFIG_LOAD_FAILURE: u8 = 1;
const EXIT_CONFIG_VALIDATION_FAILURE: u8 = 2;
const EXIT_INIT_FAILURE: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("dataminer-daemon {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::from(EXIT_INIT_FAILURE);
        }
    };

    runtime.block_on(async_main(cli.config))
}

fn print_help() {
    println!("dataminer-daemon — cron-driven exchange market-data ingestion daemon");
    println!();
    println!("USAGE:");
    println!("    dataminer-daemon [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>   Path to the YAML config file [default: ./config/config.yaml]");
    println!("        --version         Print version and exit");
    println!("        --help            Print this help and exit");
}

async fn async_main(config_path: String) -> ExitCode {
    init_tracing();

    let config = match dataminer_config::load_from_path(&config_path) {
        Ok(config) => config,
        Err(dataminer_config::ConfigError::Validation(msg)) => {
            eprintln!("config validation failed: {msg}");
            return ExitCode::from(EXIT_CONFIG_VALIDATION_FAILURE);
        }
        Err(err) => {
            eprintln!("failed to load config from {config_path}: {err}");
            return ExitCode::from(EXIT_CONFIG_LOAD_FAILURE);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("system initialization failed: {err:?}");
            ExitCode::from(EXIT_INIT_FAILURE)
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let sink: Arc<dyn dataminer_model::RecordSink> = Arc::new(FnSink(|record: Record| {
        tracing::debug!(
            exchange = %record.exchange,
            symbol = %record.symbol,
            data_type = record.data_type(),
            "record delivered"
        );
    }));

    let ws_shutdown = Arc::new(Notify::new());

    let exchanges = wiring::wire_exchanges(&config, sink, ws_shutdown.clone())
        .await
        .context("failed to wire exchanges from config")?;

    let app_state = Arc::new(state::AppState::new(exchanges));

    let app = routes::build_router(app_state.clone()).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8900)));
    info!("dataminer-daemon health endpoint listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind health-check listener")?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("health-check server crashed")?;
        }
        _ = shutdown::wait_for_shutdown_signal() => {
            shutdown::graceful_shutdown(&app_state.exchanges, &ws_shutdown, shutdown::SHUTDOWN_BUDGET).await;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("DATAMINER_DAEMON_ADDR").ok()?.parse().ok()
}
