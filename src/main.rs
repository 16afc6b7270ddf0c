use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flstudio_mcp::config::Config;
#[cfg(unix)]
use flstudio_mcp::mcp::run_socket;
use flstudio_mcp::mcp::{run_stdio, FlStudioMcp};
use flstudio_mcp::midi::MidiSession;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // stdout carries the protocol, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level '{}'", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = MidiSession::new(&config.midi_port);

    // Handle --list-ports
    if config.list_ports {
        let ports = session.list_ports();
        println!("Input ports:");
        for port in &ports.input {
            println!("  {}", port);
        }
        println!("Output ports:");
        for port in &ports.output {
            println!("  {}", port);
        }
        return Ok(());
    }

    // The scripting surface only exists inside a running FL Studio
    warn!("FL Studio API not available. Running in MIDI-only mode.");
    let mcp = Arc::new(FlStudioMcp::new(session, None));

    let result = serve_until_shutdown(&config, mcp.clone()).await;

    // Every client has stopped by now, so held notes are already released
    mcp.session().lock().disconnect();
    info!("Shutdown complete");
    result
}

#[cfg_attr(not(unix), allow(unused_variables))]
async fn serve_until_shutdown(config: &Config, mcp: Arc<FlStudioMcp>) -> Result<()> {
    #[cfg(unix)]
    {
        if let Some(path) = &config.transport.socket {
            return run_socket(mcp, path, shutdown_signal()).await;
        }
    }

    tokio::select! {
        r = run_stdio(mcp) => r,
        _ = shutdown_signal() => Ok(()),
    }
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
