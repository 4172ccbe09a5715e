//! Synthetic telemetry generator binary

use clap::Parser;
use loggremlin::config::Exporter;
use loggremlin::driver::DriverReport;
use loggremlin::sink::{OtlpSinkFactory, SinkFactory, StdoutSinkFactory};
use loggremlin::{Config, EmissionDriver, GeneratorError, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = initialize_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting loggremlin v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::parse();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let run_id = Uuid::new_v4();
    info!(
        run_id = %run_id,
        exporter = ?config.exporter,
        batch_size = config.batch_size,
        sleep_interval_secs = config.sleep_interval_secs,
        "Generator configuration loaded"
    );

    let result = match config.exporter {
        Exporter::Otlp => {
            info!("Connecting to OTEL at {}:{}", config.otel_host, config.otel_port);
            let factory =
                OtlpSinkFactory::new(config.endpoint(), config.span_export_delay(), run_id);
            run(&config, factory).await
        }
        Exporter::Stdout => run(&config, StdoutSinkFactory).await,
    };

    match result {
        Ok(report) => {
            info!(
                emitted = report.emitted,
                failed = report.failed,
                batches = report.batches,
                "Generator stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!(kind = e.kind(), "Generator failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run the driver on its own task until a stop signal arrives or it exits.
async fn run<F>(config: &Config, factory: F) -> Result<DriverReport>
where
    F: SinkFactory + 'static,
{
    let mut driver = EmissionDriver::from_config(config, factory)?;
    let shutdown = CancellationToken::new();

    let mut task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { driver.run(shutdown).await }
    });

    tokio::select! {
        () = shutdown_signal() => {
            info!("Waiting for the current batch to finish");
            shutdown.cancel();
        }
        joined = &mut task => {
            warn!("Emission driver exited without a stop signal");
            return joined.map_err(GeneratorError::from);
        }
    }

    Ok(task.await?)
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Initialize structured logging on stderr; stdout is reserved for the
/// stdout exporter.
fn initialize_tracing() -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .map_err(|e| GeneratorError::Config(format!("invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| GeneratorError::Config(format!("tracing already initialized: {}", e)))
}
