//! transportd entry point.
//!
//! Runs the transport service daemon against a simulated network: the
//! configured nodes are mounted on an in-memory device backend and power
//! control is simulated. Service requests are read from a YAML file.

use anyhow::Context;
use clap::Parser;
use otn_orch_common::{init_logging, InMemoryDevice, SimulatedPowerManagement};
use otn_servicehandler::{parse_requests, InMemoryServiceStore, TransportConfig, TransportDaemon};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// Transport service provisioning daemon
#[derive(Parser, Debug)]
#[command(name = "transportd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// YAML file of service create requests submitted at startup
    #[arg(short = 'r', long)]
    request: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Device transaction timeout in milliseconds
    #[arg(long)]
    device_timeout_ms: Option<u64>,

    /// Nodes rendered concurrently per path
    #[arg(long)]
    max_parallel_nodes: Option<usize>,

    /// Verify the signal with PM counters after power setup
    #[arg(long)]
    verify_signal: bool,

    /// Simulated nodes, overriding the configuration
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<TransportConfig> {
        let mut config = match &self.config {
            Some(path) => TransportConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => TransportConfig::default(),
        };
        if let Some(timeout) = self.device_timeout_ms {
            config.device.timeout_ms = timeout;
        }
        if let Some(parallel) = self.max_parallel_nodes {
            config.renderer.max_parallel_nodes = parallel;
        }
        if self.verify_signal {
            config.olm.verify_signal = true;
        }
        if !self.nodes.is_empty() {
            config.simulation.nodes = self.nodes.clone();
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "transportd failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.load_config()?;

    info!("Starting transportd");
    info!(
        nodes = ?config.simulation.nodes,
        device_timeout_ms = config.device.timeout_ms,
        max_parallel_nodes = config.renderer.max_parallel_nodes,
        verify_signal = config.olm.verify_signal,
        "configuration loaded"
    );

    let device = Arc::new(InMemoryDevice::with_nodes(config.simulation.nodes.iter().cloned()));
    let olm = Arc::new(SimulatedPowerManagement::new());
    olm.set_fail_setup(config.simulation.power_fail);
    let datastore = Arc::new(InMemoryServiceStore::new());

    let mut daemon = TransportDaemon::new(&config, device, olm, datastore);
    let mut reports = daemon.subscribe();
    daemon.start().context("starting daemon")?;

    let shutdown = daemon.shutdown_token();
    let reporter = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                report = reports.recv() => match report {
                    Ok(report) => info!(
                        service = %report.service_name,
                        correlation_id = %report.correlation_id,
                        status = %report.status,
                        state = ?report.state,
                        "{}",
                        report.message
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status reports dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    if let Some(path) = &args.request {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let requests = parse_requests(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(count = requests.len(), "submitting service requests");
        for request in requests {
            let name = request.service_name.clone();
            match daemon.handler().create_service(request).await {
                Ok(correlation_id) => info!(service = %name, %correlation_id, "service submitted"),
                Err(e) => warn!(service = %name, error = %e, "service rejected"),
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Received SIGINT, shutting down gracefully..."),
        Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
    }

    daemon.stop();
    daemon.join().await;
    if let Err(e) = reporter.await {
        warn!(error = %e, "status reporter aborted");
    }
    info!("transportd exited");
    Ok(())
}
