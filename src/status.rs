use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fire-and-forget status event publisher.
///
/// `publish` pushes onto an unbounded channel and returns immediately; a
/// background task owns the Redis connection and drains the channel. A slow
/// or absent bus degrades to dropped events, never to blocked requests, and
/// no lock is shared with the breaker registry.
#[derive(Clone)]
pub struct StatusPublisher {
    tx: mpsc::UnboundedSender<String>,
}

/// Minimum gap between reconnect attempts after a failed publish.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

impl StatusPublisher {
    /// Publisher wired to a Redis `PUBLISH` drain task. Must be called from
    /// within a tokio runtime.
    pub fn connect(redis_url: &str, channel: &str) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_drain_task(rx, redis_url.to_string(), channel.to_string());
        Self { tx }
    }

    /// Publisher with no bus attached; returns the receiving end so tests
    /// can assert on emitted events.
    pub fn disconnected() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: impl Into<String>) {
        let event = event.into();
        debug!("status: publishing event, event={}", event);
        if self.tx.send(event).is_err() {
            debug!("status: drain task gone, event dropped");
        }
    }
}

/// Owns the Redis connection for the lifetime of the publisher.
///
/// Connects lazily on the first event and reconnects after failures, with a
/// floor between attempts so a down bus is not hammered. Events that arrive
/// while the bus is unavailable are dropped; the channel is at-most-once.
fn spawn_drain_task(mut rx: mpsc::UnboundedReceiver<String>, url: String, channel: String) {
    tokio::spawn(async move {
        let client = match redis::Client::open(url.as_str()) {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "status: invalid redis url, status publishing disabled, error={}",
                    e
                );
                // Keep draining so senders never accumulate a dead buffer.
                while rx.recv().await.is_some() {}
                return;
            }
        };

        let mut conn: Option<redis::aio::MultiplexedConnection> = None;
        let mut next_attempt = Instant::now();

        while let Some(event) = rx.recv().await {
            if conn.is_none() {
                if Instant::now() < next_attempt {
                    debug!("status: bus down, event dropped, event={}", event);
                    continue;
                }
                match client.get_multiplexed_async_connection().await {
                    Ok(new_conn) => conn = Some(new_conn),
                    Err(e) => {
                        warn!("status: redis connect failed, event dropped, error={}", e);
                        next_attempt = Instant::now() + RECONNECT_BACKOFF;
                        continue;
                    }
                }
            }

            if let Some(active) = conn.as_mut() {
                let result: redis::RedisResult<()> = active.publish(&channel, &event).await;
                if let Err(e) = result {
                    warn!("status: publish failed, event dropped, error={}", e);
                    conn = None;
                    next_attempt = Instant::now() + RECONNECT_BACKOFF;
                }
            }
        }
    });
}
