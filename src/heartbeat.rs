use crate::server::bootstrap::{init_tracing, sleep_or_shutdown, wait_for_shutdown};
use anyhow::Result;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Monitor configuration, from CLI flags with environment overrides.
pub struct HeartbeatArgs {
    pub proxy_url: String,
    pub interval_secs: u64,
    pub redis_url: String,
    pub status_channel: String,
}

impl HeartbeatArgs {
    /// Environment overrides for deployment-injected coordinates.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VANE_PROXY_URL") {
            self.proxy_url = v;
        }
        if let Ok(v) = std::env::var("VANE_REDIS_URL") {
            self.redis_url = v;
        }
        if let Ok(v) = std::env::var("VANE_STATUS_CHANNEL") {
            self.status_channel = v;
        }
    }
}

/// Monitor lifecycle: start both loops, block until signal.
///
/// The liveness poll loop and the status subscription loop share no state
/// beyond the shutdown signal and never block each other.
pub async fn run(args: HeartbeatArgs) -> Result<()> {
    init_tracing();

    let shutdown = Arc::new(Notify::new());
    start_subscribe_loop(
        args.redis_url.clone(),
        args.status_channel.clone(),
        &shutdown,
    );
    start_liveness_loop(
        args.proxy_url.clone(),
        Duration::from_secs(args.interval_secs.max(1)),
        &shutdown,
    );

    wait_for_shutdown(&shutdown).await;
    info!("heartbeat: shutdown complete");
    Ok(())
}

/// Fixed-cadence liveness poll against the proxy's `/health` endpoint.
///
/// A failed poll raises an alert and the loop continues; the process never
/// exits because of a failed check.
fn start_liveness_loop(proxy_url: String, interval: Duration, shutdown: &Arc<Notify>) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build liveness client");
        loop {
            check_health(&client, &proxy_url).await;
            if sleep_or_shutdown(interval, &shutdown).await {
                return;
            }
        }
    });
}

async fn check_health(client: &reqwest::Client, proxy_url: &str) {
    let url = format!("{}/health", proxy_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            info!("heartbeat: proxy is healthy");
        }
        Ok(response) => {
            error!(
                "heartbeat: proxy unhealthy status, status={}",
                response.status().as_u16()
            );
            raise_alert("proxy returned non-200 from /health");
        }
        Err(e) => {
            error!("heartbeat: proxy unreachable, error={}", e);
            raise_alert("proxy failed health check");
        }
    }
}

/// Alert delivery is a log line in this system; real routing (pager, chat)
/// is expected to hang off the same log stream.
fn raise_alert(message: &str) {
    error!("alert: {}", message);
}

/// Long-lived subscription to the proxy's status channel, resubscribing
/// with a backoff whenever the stream ends or the connection drops.
fn start_subscribe_loop(redis_url: String, channel: String, shutdown: &Arc<Notify>) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = subscribe_once(&redis_url, &channel) => {
                    match result {
                        Ok(()) => warn!("heartbeat: status stream ended, resubscribing..."),
                        Err(e) => warn!("heartbeat: subscribe failed, retrying in 5s, error={}", e),
                    }
                }
                _ = shutdown.notified() => return,
            }
            if sleep_or_shutdown(Duration::from_secs(5), &shutdown).await {
                return;
            }
        }
    });
}

/// One subscription session: consume messages until the stream ends.
async fn subscribe_once(redis_url: &str, channel: &str) -> Result<()> {
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!("heartbeat: subscribed to status channel, channel={}", channel);

    let mut stream = pubsub.on_message();
    while let Some(message) = stream.next().await {
        match message.get_payload::<String>() {
            Ok(payload) => info!("heartbeat: status from proxy, status={}", payload),
            Err(e) => warn!("heartbeat: undecodable status payload, error={}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_apply() {
        let mut args = HeartbeatArgs {
            proxy_url: "http://127.0.0.1:8080".to_string(),
            interval_secs: 5,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            status_channel: "status_channel".to_string(),
        };
        std::env::set_var("VANE_PROXY_URL", "http://proxy:9999");
        args.apply_env_overrides();
        std::env::remove_var("VANE_PROXY_URL");
        assert_eq!(args.proxy_url, "http://proxy:9999");
        assert_eq!(args.status_channel, "status_channel");
    }
}
