#![forbid(unsafe_code)]

use std::time::Duration;

use clap::Parser;
use synward_ebpf::SynFilter;
use synward_lib::engine::RateEngine;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{self, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Watches inbound traffic for TCP SYN requests and drops packets from
/// sources whose estimated SYN rate exceeds the threshold.
#[derive(Parser, Debug)]
#[command(version, about = "XDP SYN flood and port scan mitigator")]
struct Cli {
    /// Verbose debug output
    #[arg(short, long)]
    verbose: bool,

    /// Estimated SYN rate above which a source is blacklisted
    #[arg(
        short,
        long,
        value_name = "NUM",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    num_packets: u64,

    /// Sampling window length, in seconds
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    time_period: u64,

    /// Network interface to attach to (e.g. eth0)
    #[arg(short, long, value_name = "IFNAME", default_value = "eth0")]
    interface: String,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Filter(#[from] synward_ebpf::FilterError),

    #[error("event loop I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

const MEASURE_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        error!(%err, "synward exited with error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RunError> {
    let mut filter = SynFilter::attach(&cli.interface)?;
    let mut blacklist = filter.take_blacklist()?;
    let events = filter.take_events()?;
    let mut events = AsyncFd::with_interest(events, Interest::READABLE)?;

    let mut engine = RateEngine::new(cli.num_packets);
    let sample_period = Duration::from_secs(cli.time_period);
    let mut next_rotation = Instant::now() + sample_period;
    let mut next_measure = Instant::now() + MEASURE_PERIOD;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    info!(
        num_packets = cli.num_packets,
        time_period = cli.time_period,
        interface = filter.interface(),
        "rate engine running"
    );

    loop {
        tokio::select! {
            guard = events.readable_mut() => {
                let mut guard = guard?;
                guard.get_inner_mut().drain(|event| engine.handle_event(&event));
                guard.clear_ready();
            }
            _ = time::sleep_until(next_rotation) => {
                engine.rotate();
                next_rotation += sample_period;
            }
            _ = time::sleep_until(next_measure) => {
                // The previous window's weight is the residual fraction of the
                // sampling interval.
                let residual = next_rotation.duration_since(Instant::now());
                let fraction = residual.as_secs_f64() / sample_period.as_secs_f64();
                engine.measure(fraction, &mut blacklist);
                next_measure += MEASURE_PERIOD;
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
        }
    }

    // Locals drop in reverse creation order: the ring consumer and blacklist
    // handle close before the filter detaches the XDP program.
    Ok(())
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins; -v only raises the default.
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
