use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use p1_exporter::{
    config::{parse_listen_addr, AppConfig, SourceKind},
    metrics_server::{self, AppState},
    observability,
    sources::{CaptureFileSource, SerialLineSource},
    Collector, MeterCollector, Pipeline,
};

/// Expose DSMR P1 meter totals as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "p1-exporter", version)]
struct Args {
    /// Serial port the meter is attached to (overrides config).
    #[arg(long)]
    port: Option<String>,

    /// Metrics listen address, e.g. ":8080" (overrides config).
    #[arg(long)]
    addr: Option<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();

    // Load configuration, then apply CLI overrides
    let mut cfg = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        cfg.serial.device = port;
    }
    if let Some(addr) = args.addr {
        cfg.http.bind_addr = addr;
    }
    cfg.validate()?;

    let listen_addr = parse_listen_addr(&cfg.http.bind_addr)?;

    let collector: Arc<dyn Collector> = match cfg.source.kind {
        SourceKind::Serial => {
            tracing::info!(device = %cfg.serial.device, "reading meter data from serial port");
            let source = SerialLineSource::new(cfg.serial.clone());
            Arc::new(MeterCollector::new(Pipeline::new(source, &cfg.collector)))
        }
        SourceKind::File => {
            let path = cfg
                .source
                .file_path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("source.file_path is not set"))?;
            tracing::info!(path = %path.display(), "replaying meter data from capture file");
            let source = CaptureFileSource::new(path);
            Arc::new(MeterCollector::new(Pipeline::new(source, &cfg.collector)))
        }
    };

    let handle = metrics_server::init_recorder()?;
    let state = AppState::new(collector, Some(handle));
    let app = metrics_server::router(state, &cfg.http.metrics_path);

    tracing::info!(addr = %listen_addr, path = %cfg.http.metrics_path, "running metric server");
    metrics_server::serve(listen_addr, app, shutdown_signal()).await?;

    tracing::info!("exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
