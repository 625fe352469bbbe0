//! procpulse - version 0.1.0
//!
//! Linux resource counters as JSON over HTTP or as a live terminal dashboard.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod health_stats;
mod startup_checks;
mod state;
mod tui;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, Commands};
use commands::{command_check, command_config, command_snapshot};
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::build_router;
use procpulse::select_reader;
use state::AppState;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogSink {
    /// stdout, or `log_file` when configured.
    Terminal,
    /// `log_file` when configured, discarded otherwise. For commands that
    /// own the terminal or stdout.
    Quiet,
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, sink: LogSink) -> Result<(), Box<dyn std::error::Error>> {
    let level: LevelFilter = config
        .log_level
        .as_deref()
        .unwrap_or("info")
        .parse()
        .map_err(|e| format!("invalid log level: {}", e))?;

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    match (&config.log_file, sink) {
        (Some(path), _) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        (None, LogSink::Quiet) => {
            let subscriber = builder.with_writer(std::io::sink).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        (None, LogSink::Terminal) => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Sizes the global rayon pool used by the process scan.
fn configure_parallelism(config: &Config) {
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
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
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        // Config generation doesn't need config validation
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Check { gpu } => {
                setup_logging(&config, LogSink::Terminal)?;
                configure_parallelism(&config);
                command_check(*gpu, &config)
            }

            Commands::Snapshot {
                format,
                pause_ms,
                verbose,
            } => {
                setup_logging(&config, LogSink::Quiet)?;
                configure_parallelism(&config);
                let (format, pause_ms, verbose) = (format.clone(), *pause_ms, *verbose);
                // The one-shot sample sleeps; keep it off the async workers.
                tokio::task::spawn_blocking(move || {
                    command_snapshot(format, pause_ms, verbose, &config).map_err(|e| e.to_string())
                })
                .await?
                .map_err(Into::into)
            }

            Commands::Dashboard { tick_ms } => {
                setup_logging(&config, LogSink::Quiet)?;
                configure_parallelism(&config);
                let tick_ms = *tick_ms;
                tokio::task::spawn_blocking(move || tui::run(&config, tick_ms))
                    .await?
                    .map_err(|e| format!("{:#}", e).into())
            }

            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;
    setup_logging(&config, LogSink::Terminal)?;

    info!("Starting procpulse");

    let reader_mode = config.reader_mode()?;
    if let Err(e) = startup_checks::validate_requirements(reader_mode, config.proc_root()) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The server will start but requests may fail!");
    }

    configure_parallelism(&config);

    let reader = select_reader(reader_mode, config.proc_root());
    let bind_ip_str = config.bind().to_string();
    let port = config.port();
    let tls = if config.tls_enabled() {
        // Both paths are present; validate_effective_config() checked them
        config.tls_cert_path.clone().zip(config.tls_key_path.clone())
    } else {
        None
    };

    let state = AppState::new(config, reader);
    let app = build_router(state);

    // Configure HTTP server
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!("procpulse listening on https://{}:{}", bind_ip_str, port);

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!("procpulse listening on http://{}:{}", bind_ip_str, port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("Server error: {}", e);
                e
            })?;
    }

    info!("procpulse stopped gracefully");
    Ok(())
}
