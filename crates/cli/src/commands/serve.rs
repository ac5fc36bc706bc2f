//! The `serve` command - runs the bridge until the listener fails.

use crate::config::{self, Overrides};
use crate::dispatcher::TraceDispatcher;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tapbridge_net::{
    BridgeConfig, ListenAddr, LinkEndpoint, MacAddr, NetworkDispatcher, TapEndpoint,
};
use tokio::net::TcpListener;

const MAX_STATS_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Args)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address (host:port, tcp:host:port or unix:path)
    #[arg(long)]
    listen: Option<ListenAddr>,

    /// Maximum payload size in bytes, excluding the ethernet header
    #[arg(long)]
    mtu: Option<u32>,

    /// Hardware address of the endpoint (aa:bb:cc:dd:ee:ff)
    #[arg(long)]
    mac: Option<MacAddr>,

    /// Seconds between traffic counter reports (0 disables them)
    #[arg(long, default_value = "0", value_parser = parse_stats_interval)]
    stats_interval: u64,
}

pub async fn run(args: ServeArgs, debug: bool) -> anyhow::Result<()> {
    let overrides = Overrides {
        listen: args.listen,
        mtu: args.mtu,
        mac: args.mac,
        debug,
    };
    let config = config::load(args.config.as_deref(), overrides)?;

    let endpoint = TapEndpoint::from_config(&config)?;
    let dispatcher = Arc::new(TraceDispatcher::default());
    let attached: Arc<dyn NetworkDispatcher> = dispatcher.clone();
    endpoint.attach(&attached);

    tracing::info!(
        listen = %config.listen,
        mtu = config.mtu,
        mac = %config.mac,
        "starting tap bridge"
    );

    if args.stats_interval > 0 {
        tokio::spawn(report_stats(
            endpoint.clone(),
            Duration::from_secs(args.stats_interval),
        ));
    }

    tokio::select! {
        result = accept(&endpoint, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            let stats = endpoint.stats();
            tracing::info!(
                sent = stats.sent_bytes,
                received = stats.received_bytes,
                packets = dispatcher.packets(),
                "shutting down"
            );
            Ok(())
        }
    }
}

async fn accept(endpoint: &TapEndpoint, config: &BridgeConfig) -> anyhow::Result<()> {
    match &config.listen {
        ListenAddr::Tcp(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("cannot listen on {addr}"))?;
            endpoint.accept_connections(listener).await?;
        }
        #[cfg(unix)]
        ListenAddr::Unix(path) => {
            remove_stale_socket(path)?;
            let listener = tokio::net::UnixListener::bind(path)
                .with_context(|| format!("cannot listen on {}", path.display()))?;
            endpoint.accept_connections(listener).await?;
        }
        #[cfg(not(unix))]
        ListenAddr::Unix(_) => {
            anyhow::bail!("unix sockets are not supported on this platform");
        }
    }
    Ok(())
}

/// Remove a socket file left behind by a previous run.
#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("cannot remove stale socket {}", path.display()))
        }
        _ => Ok(()),
    }
}

/// Log the traffic counters every `period`, forever.
async fn report_stats(endpoint: TapEndpoint, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        interval.tick().await;
        let stats = endpoint.stats();
        let connected = endpoint.is_connected().await;
        tracing::info!(
            sent = stats.sent_bytes,
            received = stats.received_bytes,
            connected,
            "link statistics"
        );
    }
}

fn parse_stats_interval(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if secs > MAX_STATS_INTERVAL_SECS {
        return Err(format!("stats interval cannot exceed {MAX_STATS_INTERVAL_SECS} seconds"));
    }
    Ok(secs)
}
