use anyhow::Result;
use clap::Parser;
use vane_proxy::heartbeat::{self, HeartbeatArgs};

#[derive(Parser)]
#[command(
    name = "vane-heartbeat",
    about = "Liveness monitor and status stream observer for the vane proxy"
)]
struct Cli {
    /// Base URL of the proxy under watch
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    proxy_url: String,

    /// Seconds between liveness polls
    #[arg(long, default_value_t = 5)]
    interval: u64,

    /// Redis connection URL for the status stream
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Pub/sub channel carrying proxy status events
    #[arg(long, default_value = "status_channel")]
    status_channel: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut args = HeartbeatArgs {
        proxy_url: cli.proxy_url,
        interval_secs: cli.interval,
        redis_url: cli.redis_url,
        status_channel: cli.status_channel,
    };
    args.apply_env_overrides();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(heartbeat::run(args))
}
